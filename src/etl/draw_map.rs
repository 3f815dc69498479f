pub mod canvas;
pub mod theme;

use std::{fs, path::{Path, PathBuf}};

use log::info;
use raqote::DrawTarget;

use crate::{
    data::semantic::GroupedFeatures,
    errors::Result,
    projection::{BoundingBox, LinearMap, ScreenPoint},
    render::{render_pass, LogProgress},
};

use self::{
    canvas::{load_font, RaqoteCanvas, ShapePainter},
    theme::{Theme, ThemeConfig},
};

use super::{read_archive, semantic_map, Etl};

pub const ETL_NAME: &str = "draw_map";
pub const OUTPUT_FILE_NAME: &str = "output.png";

/// Label sizes are given for a 180 pixel high frame.
const LABEL_REFERENCE_HEIGHT: f64 = 180.0;

pub struct DrawMapEtl {
    bbox: BoundingBox,
    width_px: u32,
    height_px: u32,
    label_size: f64,
    font_path: Option<PathBuf>,
    theme: Theme,
}

impl DrawMapEtl {
    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    pub fn new(
        bbox: BoundingBox,
        (width_px, height_px): (u32, u32),
        label_size: f64,
        font_path: Option<&Path>,
        theme: &ThemeConfig,
    ) -> DrawMapEtl {
        DrawMapEtl {
            bbox,
            width_px,
            height_px,
            label_size,
            font_path: font_path.map(Path::to_path_buf),
            theme: Theme::new(theme),
        }
    }

    fn effective_label_size(&self) -> f64 {
        self.label_size * self.height_px as f64 / LABEL_REFERENCE_HEIGHT
    }
}

impl Etl for DrawMapEtl {
    type Input = GroupedFeatures;
    type Output = DrawTarget;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, _dir: &Path) -> Result<bool> {
        Ok(false)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        fs::remove_file(Self::output_path(dir))?;
        Ok(())
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        read_archive(&dir.join(semantic_map::OUTPUT_FILE_NAME))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let map = LinearMap::new(
            &self.bbox,
            self.width_px as f64,
            self.height_px as f64,
            ScreenPoint::new(0.0, 0.0),
        )?;
        let font = load_font(self.font_path.as_deref())?;
        let painter = ShapePainter::new(self.width_px.try_into()?, self.height_px.try_into()?, &self.theme);
        let mut canvas = RaqoteCanvas::new(painter, font);

        let summary = render_pass(&input, &map, self.effective_label_size(), &mut canvas, &mut LogProgress);
        info!(drawn = summary.drawn, labels = summary.labels; "Render pass finished");
        Ok(canvas.into_target())
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        output.write_png(
            Self::output_path(dir)
        ).map_err(|_| "Couldn't write png. (encoding error)".into())
    }
}
