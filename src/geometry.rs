use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoGeometry {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub fps: f64,
}

impl VideoGeometry {
    /// Horizontal iff strictly wider than tall; square counts as vertical.
    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// scale + pad filter pair that fits an arbitrary still image into the
/// source video's exact pixel dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFit {
    pub scale: String,
    pub pad: String,
}

/// Horizontal sources get the image scaled to full height and pillarboxed;
/// vertical sources get it scaled to full width and letterboxed. Either way
/// the reaction clip matches the source resolution.
pub fn fit_filters(geometry: &VideoGeometry) -> CompositeFit {
    let (w, h) = (geometry.width, geometry.height);
    match geometry.orientation() {
        Orientation::Horizontal => CompositeFit {
            scale: format!("scale=-1:{}", h),
            pad: format!("pad={}:{}:(ow-iw)/2:0:black", w, h),
        },
        Orientation::Vertical => CompositeFit {
            scale: format!("scale={}:-1", w),
            pad: format!("pad={}:{}:0:(oh-ih)/2:black", w, h),
        },
    }
}

/// Resolution-proportional caption size.
pub fn font_size(geometry: &VideoGeometry) -> u32 {
    geometry.width.min(geometry.height) / 10
}

/// Escape the characters drawtext treats as syntax inside a quoted text
/// argument: backslash, quote, colon, percent.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
        .replace('%', "\\%")
}

/// Full filter_complex for one reaction clip: fit the still image, then
/// draw the caption centered near the bottom.
pub fn composite_filter(text: &str, font_path: &str, geometry: &VideoGeometry) -> String {
    let fit = fit_filters(geometry);
    format!(
        "[0:v]{},{},drawtext=text='{}':fontfile='{}':fontsize={}:fontcolor=white:borderw=4:bordercolor=black:x=(w-text_w)/2:y=h-h/6[v]",
        fit.scale,
        fit.pad,
        escape_drawtext(text),
        font_path,
        font_size(geometry),
    )
}

/// Declarative instruction for one reaction composite, consumed by the
/// media-transcoding collaborator.
#[derive(Debug, Clone)]
pub struct CompositeSpec {
    pub image: PathBuf,
    pub audio: PathBuf,
    /// Clip length; clamped to the synthesized audio's duration.
    pub duration: f64,
    pub fps: f64,
    pub filter_complex: String,
}

pub fn composite_spec(
    image: &Path,
    audio: &Path,
    audio_duration: f64,
    text: &str,
    font_path: &str,
    geometry: &VideoGeometry,
) -> CompositeSpec {
    CompositeSpec {
        image: image.to_path_buf(),
        audio: audio.to_path_buf(),
        duration: audio_duration,
        fps: geometry.fps,
        filter_complex: composite_filter(text, font_path, geometry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo(width: u32, height: u32) -> VideoGeometry {
        VideoGeometry {
            width,
            height,
            duration: 10.0,
            fps: 30.0,
        }
    }

    #[test]
    fn orientation_is_horizontal_only_when_wider() {
        assert_eq!(geo(1920, 1080).orientation(), Orientation::Horizontal);
        assert_eq!(geo(1080, 1920).orientation(), Orientation::Vertical);
        assert_eq!(geo(1080, 1080).orientation(), Orientation::Vertical);
    }

    #[test]
    fn horizontal_fit_pillarboxes() {
        let fit = fit_filters(&geo(1920, 1080));
        assert_eq!(fit.scale, "scale=-1:1080");
        assert_eq!(fit.pad, "pad=1920:1080:(ow-iw)/2:0:black");
    }

    #[test]
    fn vertical_fit_letterboxes() {
        let fit = fit_filters(&geo(1080, 1920));
        assert_eq!(fit.scale, "scale=1080:-1");
        assert_eq!(fit.pad, "pad=1080:1920:0:(oh-ih)/2:black");
    }

    #[test]
    fn font_size_tracks_smaller_dimension() {
        assert_eq!(font_size(&geo(1920, 1080)), 108);
        assert_eq!(font_size(&geo(1080, 1920)), 108);
        assert_eq!(font_size(&geo(640, 480)), 48);
    }

    #[test]
    fn drawtext_escaping_covers_quotes_and_colons() {
        assert_eq!(escape_drawtext("it's 5:00"), "it'\\''s 5\\:00");
        assert_eq!(escape_drawtext(r"a\b"), r"a\\b");
        assert_eq!(escape_drawtext("100%"), "100\\%");
    }

    #[test]
    fn composite_filter_places_caption_near_bottom() {
        let filter = composite_filter("hello", "/fonts/a.ttf", &geo(1080, 1920));
        assert!(filter.contains("y=h-h/6"));
        assert!(filter.contains("x=(w-text_w)/2"));
        assert!(filter.contains("fontsize=108"));
        assert!(filter.starts_with("[0:v]scale=1080:-1,pad=1080:1920:0:(oh-ih)/2:black,"));
        assert!(filter.ends_with("[v]"));
    }
}
