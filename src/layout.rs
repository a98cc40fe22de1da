//! Layout Engine - Shared Render Geometry
//!
//! Every writer draws from the same [`RenderPlan`], so raster and vector
//! outputs of one configuration superimpose exactly.

use serde::Serialize;
use tracing::debug;

use crate::config::{Configuration, LabelAlignment};
use crate::error::{QrError, Result};
use crate::fonts::{FontProvider, TextMetrics};
use crate::grid::ModuleGrid;

/// Logo side requested when none is configured, as a percentage of the content size.
pub const DEFAULT_LOGO_PERCENT: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelPlacement {
    pub text: String,
    pub bounds: Rect,
    /// Absolute y of the text baseline.
    pub baseline: u32,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderPlan {
    pub grid_side: u32,
    pub module_size: u32,
    pub content_size: u32,
    /// Top-left corner of module (0, 0) on the canvas.
    pub grid_x: u32,
    pub grid_y: u32,
    /// Side of the square block holding the grid and its quiet zone.
    pub block_size: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub logo: Option<Rect>,
    pub label: Option<LabelPlacement>,
}

/// Module pixel size, content size, centering offset and block side for one axis.
pub(crate) fn fit_grid(size: u32, quiet_zone: u32, side: u32) -> Result<(u32, u32, u32, u32)> {
    if size == 0 {
        return Err(QrError::invalid_argument("target size must be positive"));
    }
    if side == 0 {
        return Err(QrError::invalid_argument("grid side must be positive"));
    }
    let margin = quiet_zone
        .checked_mul(2)
        .ok_or_else(|| QrError::invalid_argument("quiet zone is too large"))?;
    let available = size.saturating_sub(margin);
    if available < side {
        let block = side
            .checked_add(margin)
            .ok_or_else(|| QrError::invalid_argument("quiet zone is too large"))?;
        return Ok((1, side, quiet_zone, block));
    }
    let module = available / side;
    let content = module * side;
    let offset = quiet_zone + (available - content) / 2;
    Ok((module, content, offset, size))
}

/// Largest logo side the error-correction level tolerates over `content` pixels.
pub fn max_logo_size(content: u32, recovery_percent: u32) -> u32 {
    (u64::from(content) * u64::from(recovery_percent) / 100) as u32
}

impl RenderPlan {
    pub fn compute(config: &Configuration, grid: &ModuleGrid, fonts: &dyn FontProvider) -> Result<Self> {
        let side = u32::try_from(grid.side())
            .map_err(|_| QrError::invalid_argument("grid side does not fit in u32"))?;
        let (module_size, content_size, offset, block_size) =
            fit_grid(config.size(), config.quiet_zone(), side)?;

        let mut plan = RenderPlan {
            grid_side: side,
            module_size,
            content_size,
            grid_x: offset,
            grid_y: offset,
            block_size,
            canvas_width: block_size,
            canvas_height: block_size,
            logo: None,
            label: None,
        };

        if let Some(text) = config.label().filter(|text| !text.is_empty()) {
            let metrics = fonts.measure(text, config.label_font_path(), config.label_font_size())?;
            plan.place_label(config, text, metrics)?;
        }

        if config.logo_path().is_some() {
            plan.place_logo(config);
        }

        debug!(
            module_size = plan.module_size,
            content_size = plan.content_size,
            canvas_width = plan.canvas_width,
            canvas_height = plan.canvas_height,
            "computed render plan"
        );
        Ok(plan)
    }

    fn place_label(&mut self, config: &Configuration, text: &str, metrics: TextMetrics) -> Result<()> {
        let margin = config.label_margin();
        let overflow = || QrError::invalid_argument("label margins overflow the canvas");
        let required = metrics
            .width
            .checked_add(margin.left)
            .and_then(|w| w.checked_add(margin.right))
            .ok_or_else(overflow)?;
        let band = metrics
            .height
            .checked_add(margin.top)
            .and_then(|h| h.checked_add(margin.bottom))
            .ok_or_else(overflow)?;
        let y = self.block_size.checked_add(margin.top).ok_or_else(overflow)?;
        let baseline = y.checked_add(metrics.baseline).ok_or_else(overflow)?;
        self.canvas_height = self.block_size.checked_add(band).ok_or_else(overflow)?;
        self.canvas_width = self.block_size.max(required);
        self.grid_x += (self.canvas_width - self.block_size) / 2;

        let x = match config.label_alignment() {
            LabelAlignment::Left => margin.left,
            LabelAlignment::Center => self.canvas_width.saturating_sub(metrics.width) / 2,
            LabelAlignment::Right => self
                .canvas_width
                .saturating_sub(metrics.width)
                .saturating_sub(margin.right),
        };
        self.label = Some(LabelPlacement {
            text: text.to_string(),
            bounds: Rect { x, y, width: metrics.width, height: metrics.height },
            baseline,
            font_size: config.label_font_size(),
        });
        Ok(())
    }

    fn place_logo(&mut self, config: &Configuration) {
        let requested = config
            .logo_size()
            .unwrap_or(self.content_size * DEFAULT_LOGO_PERCENT / 100);
        let limit = max_logo_size(self.content_size, config.error_correction_level().recovery_percent());
        let side = requested.min(limit);
        if side < requested {
            debug!(requested, clamped = side, "logo clamped to error correction budget");
        }
        if side == 0 {
            return;
        }
        let inset = (self.content_size - side) / 2;
        self.logo = Some(Rect {
            x: self.grid_x + inset,
            y: self.grid_y + inset,
            width: side,
            height: side,
        });
    }

    /// Canvas rectangle covered by a horizontal run of `length` modules.
    pub fn run_rect(&self, x: usize, y: usize, length: usize) -> Rect {
        Rect {
            x: self.grid_x + x as u32 * self.module_size,
            y: self.grid_y + y as u32 * self.module_size,
            width: length as u32 * self.module_size,
            height: self.module_size,
        }
    }

    pub fn module_rect(&self, x: usize, y: usize) -> Rect {
        self.run_rect(x, y, 1)
    }
}
