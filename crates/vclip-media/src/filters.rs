//! Reusable FFmpeg video filter string assembly.
//!
//! These are the building blocks `render_graph` composes into a full
//! `-filter_complex` description; kept standalone so unit tests can check
//! individual filter fragments without constructing a whole graph.

use vclip_models::FitMode;

/// Scale+pad (contain) or scale+crop (cover) a stream into `w`x`h`.
pub fn filter_fit(w: u32, h: u32, mode: FitMode) -> String {
    match mode {
        FitMode::Cover => format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}"
        ),
        FitMode::Contain => format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
        ),
    }
}

/// Face-centered crop to `w`x`h`, anchored at normalized `(focus_x, focus_y)`
/// instead of the frame center. Falls back to a centered crop when no face
/// focus point is available.
pub fn filter_face_centered_crop(w: u32, h: u32, focus_x: Option<f64>, focus_y: Option<f64>) -> String {
    let (fx, fy) = (focus_x.unwrap_or(0.5), focus_y.unwrap_or(0.5));
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,\
         crop={w}:{h}:max(min((iw-{w})*{fx}\\,iw-{w})\\,0):max(min((ih-{h})*{fy}\\,ih-{h})\\,0)"
    )
}

/// `setpts`-based speed change for video.
pub fn filter_speed(speed: f64) -> String {
    format!("setpts=(PTS-STARTPTS)/{speed:.4}")
}

/// Zoom filter approximating a slow push-in, anchored at a face focus point
/// when given.
pub fn filter_zoom(zoom: f64, focus_x: Option<f64>, focus_y: Option<f64>) -> String {
    let (fx, fy) = (focus_x.unwrap_or(0.5), focus_y.unwrap_or(0.5));
    format!(
        "zoompan=z='min(zoom+{zoom:.4}/100\\,1+{zoom:.4})':x='iw*{fx}-(iw/zoom/2)':y='ih*{fy}-(ih/zoom/2)':d=1"
    )
}

/// Brightness EQ.
pub fn filter_brightness(brightness: f64) -> String {
    format!("eq=brightness={brightness:.4}")
}

/// Crop the left half of a frame.
pub fn filter_crop_left_half() -> &'static str {
    "crop=iw/2:ih:0:0"
}

/// Crop the right half of a frame.
pub fn filter_crop_right_half() -> &'static str {
    "crop=iw/2:ih:iw/2:0"
}

/// Stack two already-fitted streams vertically (used by the vertical
/// stacked layout: webcam crop on top, fitted full frame on bottom).
pub fn filter_vstack(top_width: u32, top_height: u32, bottom_width: u32, bottom_height: u32) -> String {
    format!(
        "[0:v]scale={}:{}:force_original_aspect_ratio=decrease,pad={}:{}:(ow-iw)/2:(oh-ih)/2[top];\
         [1:v]scale={}:{}:force_original_aspect_ratio=decrease,pad={}:{}:(ow-iw)/2:(oh-ih)/2[bottom];\
         [top][bottom]vstack",
        top_width, top_height, top_width, top_height,
        bottom_width, bottom_height, bottom_width, bottom_height
    )
}

/// Thumbnail scale filter.
pub fn filter_thumbnail(width: u32) -> String {
    format!("scale={}:-2", width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_cover_crops_to_exact_dimensions() {
        let filter = filter_fit(1080, 1920, FitMode::Cover);
        assert!(filter.contains("crop=1080:1920"));
    }

    #[test]
    fn fit_contain_pads_to_exact_dimensions() {
        let filter = filter_fit(1080, 1920, FitMode::Contain);
        assert!(filter.contains("pad=1080:1920"));
    }

    #[test]
    fn face_centered_crop_falls_back_to_center() {
        let filter = filter_face_centered_crop(1080, 1920, None, None);
        assert!(filter.contains("0.5"));
    }

    #[test]
    fn vstack_filter_contains_both_inputs() {
        let filter = filter_vstack(1080, 960, 1080, 960);
        assert!(filter.contains("vstack"));
        assert!(filter.contains("[top][bottom]"));
    }
}
