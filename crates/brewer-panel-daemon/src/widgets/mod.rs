//! Composite widgets drawn into the framebuffer and sent to the panel.
//!
//! Every widget is bound to one brewer quantity. Bindings a widget cannot
//! display are rejected before anything is drawn.

mod bar_adjuster;
mod progress_bar;

pub use bar_adjuster::bar_adjuster;
pub use progress_bar::{progress_bar, ProgressBackground};

use brewer_panel_hw::Framebuffer;
use thiserror::Error;

use crate::brew::Quantity;

/// Widget drawing errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WidgetError {
    #[error("{widget} cannot display {quantity:?}")]
    UnsupportedBinding {
        widget: &'static str,
        quantity: Quantity,
    },

    #[error("{widget} value {value} outside {min}..={max}")]
    OutOfRange {
        widget: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Background {width}x{height} is smaller than {min_width}x{min_height}")]
    BackgroundTooSmall {
        width: u16,
        height: u16,
        min_width: u16,
        min_height: u16,
    },

    #[error(transparent)]
    Panel(#[from] brewer_panel_hw::Error),
}

/// Top-left corner of a `width` x `height` box centered on `(cx, cy)`.
fn centered(
    fb: &Framebuffer,
    cx: u16,
    cy: u16,
    width: u16,
    height: u16,
) -> brewer_panel_hw::Result<(u16, u16)> {
    let x = cx.checked_sub(width / 2);
    let y = cy.checked_sub(height / 2);
    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(brewer_panel_hw::Error::OutOfBounds {
            x1: x.unwrap_or(0),
            y1: y.unwrap_or(0),
            x2: cx.saturating_add(width - width / 2),
            y2: cy.saturating_add(height - height / 2),
            width: fb.width(),
            height: fb.height(),
        }),
    }
}
