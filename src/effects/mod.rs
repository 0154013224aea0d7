use crossterm::event::Event;
use std::io::{BufWriter, Stdout};

pub mod flight;
pub mod landscape;
pub mod net;
pub mod terminal;
pub mod tunnel;

/// The mountable views. Terminal is the default; the shell's command
/// table reaches Net and Flight, the rest are CLI-selectable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewId {
    Terminal,
    Net,
    Flight,
    Tunnel,
    Landscape,
}

/// A mounted full-screen view. Constructors take (width, height) in
/// half-block pixels; the driver rebuilds the active view on resize.
pub trait Effect {
    fn update(&mut self, dt: f32);
    fn render(&mut self, stdout: &mut BufWriter<Stdout>) -> std::io::Result<()>;
    fn handle_event(&mut self, _event: &Event) {}
}
