use super::{Effect, ViewId};
use crossterm::event::{Event, KeyCode, KeyModifiers, MouseEventKind};
use std::io::{BufWriter, Stdout, Write};

const GREEN: (u8, u8, u8) = (34, 197, 94);
const GREEN_DIM: (u8, u8, u8) = (21, 128, 61);
const GREEN_HOT: (u8, u8, u8) = (64, 235, 130);

/// Cursor blink half-period.
const BLINK_SECS: f32 = 0.53;
/// Welcome banner reveal speed in characters per second.
const REVEAL_RATE: f32 = 200.0;

const WELCOME: &str = r#"
  /////////////////////////////////////////////////////////////
  //                                                         //
  //   SYSTEM V11.0                                          //
  //   (c) 1985-2025 jaqbek Visuals                          //
  //                                                         //
  //   >LOADING VISUAL SEQUENCE MODULE...                    //
  //   >ACCESS GRANTED                                       //
  //                                                         //
  /////////////////////////////////////////////////////////////

  SELECT VISUALIZATION SEQUENCE:

  [1] ZOOMING NET CELL - Infinite grid zoom with CRT effects
  [2] PERSPECTIVE FLIGHT - Space flight through star field

  INFO: PRESS [ESC] TO RETURN TO TERMINAL DURING VISUALIZATION

  INPUT SELECTION AND PRESS ENTER:"#;

const FOOTER: &str = "MEMORY: 640K OK | PRESS [ESC] TO RETURN | SYS-REF: VT-25/CL";

/// The shell's response table. Commands are matched after trimming and
/// lowercasing; anything else is echoed back as unrecognized.
fn response(command: &str) -> Option<&'static str> {
    Some(match command {
        "help" => {
            "Available commands:\nhelp - Show this help message\n1 or \"net\" - Launch Zooming Net Cell\n2 or \"flight\" - Launch Perspective Flight\nclear - Clear terminal\ninfo - Show system information"
        }
        "info" => {
            "SYSTEM: Visualization Terminal v11.0\nCPU: 12.8MHz\nMEMORY: 640K RAM\nVIDEO: CRT-9800 Graphics Accelerator\nOS: TermOS 3.1\n\nESCAPE KEY FUNCTION:\n- Returns to Terminal from Active Visualization\n- Interrupts Current Visual Sequence"
        }
        "clear" => "",
        "1" | "net" => "Launching Zooming Net Cell...",
        "2" | "flight" => "Launching Perspective Flight...",
        "exit" => "Cannot terminate visualization sequence. Override required.",
        "ls" | "dir" => {
            "Directory listing:\n> net_cell.vis\n> flight.vis\n> system.cfg [LOCKED]"
        }
        _ => return None,
    })
}

/// Green-phosphor command shell: typing-reveal banner, blinking cursor,
/// command history, and the launch commands for the visualizations.
pub struct TerminalView {
    rows: usize,
    revealed: f32,
    show_full: bool,
    cursor_timer: f32,
    cursor_visible: bool,
    input: String,
    history: Vec<String>,
    selection: Option<ViewId>,
    output_buf: Vec<u8>,
}

impl TerminalView {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            rows,
            revealed: 0.0,
            show_full: false,
            cursor_timer: 0.0,
            cursor_visible: true,
            input: String::new(),
            history: Vec::new(),
            selection: None,
            output_buf: Vec::with_capacity(cols * rows * 4),
        }
    }

    /// The view the user asked to launch, if any. Cleared on read.
    pub fn take_selection(&mut self) -> Option<ViewId> {
        self.selection.take()
    }

    fn run_command(&mut self, raw: &str) {
        let command = raw.trim().to_lowercase();
        if command.is_empty() {
            return;
        }
        self.history.push(format!(">{command}"));
        match response(&command) {
            Some(text) => {
                self.history.push(text.to_string());
                match command.as_str() {
                    "clear" => self.history.clear(),
                    "1" | "net" => self.selection = Some(ViewId::Net),
                    "2" | "flight" => self.selection = Some(ViewId::Flight),
                    _ => {}
                }
            }
            None => self
                .history
                .push(format!("Command not recognized: {command}")),
        }
    }

    fn reveal_done(&self) -> bool {
        self.show_full || self.revealed as usize >= WELCOME.chars().count()
    }
}

impl Effect for TerminalView {
    fn update(&mut self, dt: f32) {
        self.cursor_timer += dt;
        if self.cursor_timer >= BLINK_SECS {
            self.cursor_timer -= BLINK_SECS;
            self.cursor_visible = !self.cursor_visible;
        }
        if !self.reveal_done() {
            self.revealed += dt * REVEAL_RATE;
        }
    }

    fn render(&mut self, stdout: &mut BufWriter<Stdout>) -> std::io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[2J\x1b[H");

        // The phosphor dances a little.
        let fg = if fastrand::f32() < 0.03 { GREEN_HOT } else { GREEN };
        write!(self.output_buf, "\x1b[38;2;{};{};{}m", fg.0, fg.1, fg.2)?;

        let shown: String = if self.show_full {
            WELCOME.to_string()
        } else {
            WELCOME.chars().take(self.revealed as usize).collect()
        };

        let prompt = if self.reveal_done() {
            let cursor = if self.cursor_visible { "█" } else { " " };
            Some(format!(">{}{}", self.input, cursor))
        } else {
            None
        };

        let mut lines: Vec<&str> = shown.split('\n').collect();
        for entry in &self.history {
            lines.extend(entry.split('\n'));
        }
        if let Some(ref p) = prompt {
            lines.push(p.as_str());
        }

        // Keep the tail on screen, leaving the last row for the footer.
        let visible = self.rows.saturating_sub(2).max(1);
        let skip = lines.len().saturating_sub(visible);
        for line in &lines[skip..] {
            self.output_buf.extend_from_slice(line.as_bytes());
            self.output_buf.extend_from_slice(b"\r\n");
        }

        write!(
            self.output_buf,
            "\x1b[{};1H\x1b[38;2;{};{};{}m{}",
            self.rows, GREEN_DIM.0, GREEN_DIM.1, GREEN_DIM.2, FOOTER
        )?;
        self.output_buf.extend_from_slice(b"\x1b[0m");

        stdout.write_all(&self.output_buf)?;
        stdout.flush()?;
        Ok(())
    }

    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Key(key) => match key.code {
                KeyCode::Enter => {
                    if self.reveal_done() {
                        let command = std::mem::take(&mut self.input);
                        self.run_command(&command);
                    } else {
                        self.show_full = true;
                    }
                }
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(c) => {
                    if !key.modifiers.contains(KeyModifiers::CONTROL) {
                        self.input.push(c);
                    }
                }
                _ => {}
            },
            Event::Mouse(mouse) => {
                if matches!(mouse.kind, MouseEventKind::Down(_)) {
                    // Clicking skips the typing animation.
                    self.show_full = true;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> TerminalView {
        TerminalView::new(80, 24)
    }

    #[test]
    fn net_commands_select_the_net_view() {
        for cmd in ["net", "1", " NET "] {
            let mut term = shell();
            term.run_command(cmd);
            assert_eq!(term.take_selection(), Some(ViewId::Net));
            assert!(term.history.contains(&"Launching Zooming Net Cell...".to_string()));
        }
    }

    #[test]
    fn flight_commands_select_the_flight_view() {
        for cmd in ["flight", "2"] {
            let mut term = shell();
            term.run_command(cmd);
            assert_eq!(term.take_selection(), Some(ViewId::Flight));
        }
    }

    #[test]
    fn unrecognized_commands_echo_without_selecting() {
        let mut term = shell();
        term.run_command("xyz");
        assert_eq!(
            term.history,
            vec![">xyz".to_string(), "Command not recognized: xyz".to_string()]
        );
        assert_eq!(term.take_selection(), None);
    }

    #[test]
    fn clear_empties_the_history() {
        let mut term = shell();
        term.run_command("help");
        term.run_command("xyz");
        assert!(!term.history.is_empty());
        term.run_command("clear");
        assert!(term.history.is_empty());
        assert_eq!(term.take_selection(), None);
    }

    #[test]
    fn exit_answers_but_selects_nothing() {
        let mut term = shell();
        term.run_command("exit");
        assert!(term.history.iter().any(|l| l.contains("Override required")));
        assert_eq!(term.take_selection(), None);
    }

    #[test]
    fn ls_and_dir_share_the_listing() {
        let mut term = shell();
        term.run_command("ls");
        term.run_command("dir");
        let listings = term
            .history
            .iter()
            .filter(|l| l.starts_with("Directory listing:"))
            .count();
        assert_eq!(listings, 2);
    }

    #[test]
    fn selection_is_consumed_on_read() {
        let mut term = shell();
        term.run_command("net");
        assert_eq!(term.take_selection(), Some(ViewId::Net));
        assert_eq!(term.take_selection(), None);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut term = shell();
        term.run_command("   ");
        assert!(term.history.is_empty());
    }

    #[test]
    fn reveal_completes_after_enough_time() {
        let mut term = shell();
        assert!(!term.reveal_done());
        for _ in 0..(60 * 10) {
            term.update(1.0 / 60.0);
        }
        assert!(term.reveal_done());
    }
}
