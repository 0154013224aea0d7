use crossterm::{
    cursor::{Hide, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::env;
use std::io::{BufWriter, stdout};
use std::time::{Duration, Instant};

mod distortion;
mod effects;
mod input;
mod overlay;
mod projector;
mod sequencer;
mod surface;

use effects::flight::FlightEffect;
use effects::landscape::LandscapeEffect;
use effects::net::NetEffect;
use effects::terminal::TerminalView;
use effects::tunnel::TunnelEffect;
use effects::{Effect, ViewId};
use input::TapEscape;

fn print_usage() {
    eprintln!("vizterm - Retro CRT visualization terminal");
    eprintln!();
    eprintln!("Usage: vizterm [VIEW]");
    eprintln!();
    eprintln!("Views:");
    eprintln!("  terminal   Command shell (default) - type 'help' at the prompt");
    eprintln!("  net        Zooming net cell with CRT post-processing");
    eprintln!("  flight     Space flight through a star field");
    eprintln!("  tunnel     Rotating polygon tunnel");
    eprintln!("  landscape  Scrolling perspective landscape grid");
    eprintln!();
    eprintln!("ESC returns from a visualization to the terminal (or exits it);");
    eprintln!("three rapid clicks do the same. Ctrl+C exits anywhere.");
}

/// What is currently mounted. The terminal keeps its concrete type so the
/// driver can collect launch selections from it.
enum ActiveView {
    Terminal(TerminalView),
    Vis(Box<dyn Effect>),
}

fn mount(id: ViewId, cols: u16, rows: u16) -> ActiveView {
    let w = cols as usize;
    let h = rows as usize * 2;
    match id {
        ViewId::Terminal => ActiveView::Terminal(TerminalView::new(w, rows as usize)),
        ViewId::Net => ActiveView::Vis(Box::new(NetEffect::new(w, h))),
        ViewId::Flight => ActiveView::Vis(Box::new(FlightEffect::new(w, h))),
        ViewId::Tunnel => ActiveView::Vis(Box::new(TunnelEffect::new(w, h))),
        ViewId::Landscape => ActiveView::Vis(Box::new(LandscapeEffect::new(w, h))),
    }
}

fn dispatch_event(view: &mut ActiveView, event: &Event) {
    match view {
        ActiveView::Terminal(term) => term.handle_event(event),
        ActiveView::Vis(effect) => effect.handle_event(event),
    }
}

fn run(initial: ViewId) -> std::io::Result<()> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    terminal::enable_raw_mode()?;
    execute!(
        stdout,
        EnterAlternateScreen,
        Hide,
        Clear(ClearType::All),
        EnableMouseCapture
    )?;

    let (mut cols, mut rows) = terminal::size()?;
    let mut current = initial;
    let mut view = mount(current, cols, rows);
    let mut taps = TapEscape::new();
    let started = Instant::now();

    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;
    const FIXED_DT: f32 = 1.0 / 60.0;

    'outer: loop {
        let mut switch_to: Option<ViewId> = None;

        if event::poll(Duration::from_millis(1))? {
            let event = event::read()?;
            match &event {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        break 'outer;
                    }
                    match key.code {
                        KeyCode::Esc => {
                            if current == ViewId::Terminal {
                                break 'outer;
                            }
                            switch_to = Some(ViewId::Terminal);
                        }
                        KeyCode::Char('q') if current != ViewId::Terminal => break 'outer,
                        _ => dispatch_event(&mut view, &event),
                    }
                }
                Event::Key(_) => {}
                Event::Resize(new_cols, new_rows) => {
                    cols = *new_cols;
                    rows = *new_rows;
                    // Surface and overlay are rebuilt together, before the
                    // next frame composites anything.
                    view = mount(current, cols, rows);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                Event::Mouse(mouse) => {
                    if matches!(mouse.kind, MouseEventKind::Down(_))
                        && current != ViewId::Terminal
                    {
                        let now_ms = started.elapsed().as_millis() as u64;
                        if taps.register(now_ms) {
                            switch_to = Some(ViewId::Terminal);
                        }
                    }
                    dispatch_event(&mut view, &event);
                }
                _ => dispatch_event(&mut view, &event),
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        accumulator += frame_time;
        if accumulator > FIXED_DT * 3.0 {
            accumulator = FIXED_DT * 3.0;
        }

        while accumulator >= FIXED_DT {
            match &mut view {
                ActiveView::Terminal(term) => term.update(FIXED_DT),
                ActiveView::Vis(effect) => effect.update(FIXED_DT),
            }
            accumulator -= FIXED_DT;
        }

        if let ActiveView::Terminal(term) = &mut view {
            if let Some(id) = term.take_selection() {
                switch_to = Some(id);
            }
        }

        if let Some(id) = switch_to {
            current = id;
            view = mount(current, cols, rows);
            execute!(stdout, Clear(ClearType::All))?;
            continue;
        }

        match &mut view {
            ActiveView::Terminal(term) => term.render(&mut stdout)?,
            ActiveView::Vis(effect) => effect.render(&mut stdout)?,
        }
    }

    execute!(stdout, Show, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal::disable_raw_mode()?;

    Ok(())
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut initial = ViewId::Terminal;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "help" | "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            arg => {
                if !arg.starts_with('-') {
                    initial = match arg {
                        "terminal" => ViewId::Terminal,
                        "net" => ViewId::Net,
                        "flight" => ViewId::Flight,
                        "tunnel" => ViewId::Tunnel,
                        "landscape" => ViewId::Landscape,
                        _ => {
                            eprintln!("Unknown view: {arg}");
                            eprintln!();
                            print_usage();
                            std::process::exit(1);
                        }
                    };
                    i += 1;
                } else {
                    eprintln!("Unknown option: {arg}");
                    eprintln!();
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
    }

    run(initial)
}
