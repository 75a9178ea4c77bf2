use crate::domain::model::Layout;
use crate::domain::ports::ContentSurface;

/// Renders the host layout to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSurface;

impl ConsoleSurface {
    pub fn new() -> Self {
        Self
    }
}

impl ContentSurface for ConsoleSurface {
    fn set_content(&self, layout: &Layout) {
        tracing::debug!("Rendering layout {}", layout.name);
        println!("┌─ {}", layout.name);
        for line in &layout.lines {
            println!("│ {}", line);
        }
        println!("└─");
    }
}
