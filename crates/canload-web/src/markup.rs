#![forbid(unsafe_code)]

//! Overlay markup and scoped styles.
//!
//! Pure string templates, compiled on every target so they can be tested
//! natively. Every selector, keyframe name and SVG id is suffixed with the
//! overlay's instance id, so two overlays on one page never share styles.

use std::fmt::Write as _;

use canload_core::{ColorParseError, FillGeometry, LoaderOptions, Skin};

/// Class of the overlay root element.
pub const OVERLAY_CLASS: &str = "canload-overlay";
/// Class added to start the fade-out.
pub const HIDE_CLASS: &str = "hide";
/// Class of the percentage label element.
pub const PERCENT_CLASS: &str = "canload-percent";
/// Class of the translated liquid group.
pub const FILL_CLASS: &str = "canload-fill";
/// Attribute carrying the instance id on the overlay root.
pub const SCOPE_ATTR: &str = "data-canload";

/// Blend used for the foam layer above the liquid.
const FOAM_LIGHTEN_PERCENT: f64 = 30.0;

/// Rendered overlay content, ready for `innerHTML`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayMarkup {
    /// Scoped `<style>` element.
    pub style: String,
    /// Container SVG and label.
    pub body: String,
}

impl OverlayMarkup {
    /// Style followed by body.
    #[must_use]
    pub fn inner_html(&self) -> String {
        let mut html = String::with_capacity(self.style.len() + self.body.len());
        html.push_str(&self.style);
        html.push_str(&self.body);
        html
    }
}

/// One animated wave layer.
#[derive(Debug, Clone, Copy)]
struct Wave {
    start_x: i32,
    end_x: i32,
    step: i32,
    crest_y: i32,
    amplitude: i32,
    bottom_y: i32,
}

impl Wave {
    /// Quadratic wave from `start_x` to `end_x`, closed down to `bottom_y`.
    fn path(self) -> String {
        let Self {
            start_x,
            end_x,
            step,
            crest_y,
            amplitude,
            bottom_y,
        } = self;
        let mut d = format!(
            "M {start_x} {crest_y} Q {} {} {} {crest_y}",
            start_x + step / 2,
            crest_y - amplitude,
            start_x + step
        );
        let mut x = start_x + 2 * step;
        while x <= end_x {
            let _ = write!(d, " T {x} {crest_y}");
            x += step;
        }
        let _ = write!(d, " L {end_x} {bottom_y} L {start_x} {bottom_y} Z");
        d
    }
}

/// Per-skin artwork constants.
struct Artwork {
    clip_x: i32,
    clip_width: i32,
    clip_radius: i32,
    liquid: Wave,
    foam: Wave,
    /// Horizontal travel of one wave animation period.
    wave_shift: i32,
}

fn artwork(skin: Skin) -> Artwork {
    match skin {
        Skin::Can => Artwork {
            clip_x: 50,
            clip_width: 100,
            clip_radius: 10,
            liquid: Wave {
                start_x: -200,
                end_x: 400,
                step: 50,
                crest_y: 60,
                amplitude: 20,
                bottom_y: 260,
            },
            foam: Wave {
                start_x: -200,
                end_x: 400,
                step: 50,
                crest_y: 55,
                amplitude: 15,
                bottom_y: 260,
            },
            wave_shift: 200,
        },
        Skin::Cup => Artwork {
            clip_x: 55,
            clip_width: 90,
            clip_radius: 8,
            liquid: Wave {
                start_x: -220,
                end_x: 300,
                step: 40,
                crest_y: 0,
                amplitude: 8,
                bottom_y: 500,
            },
            foam: Wave {
                start_x: -220,
                end_x: 300,
                step: 40,
                crest_y: -4,
                amplitude: 8,
                bottom_y: 500,
            },
            wave_shift: 220,
        },
    }
}

/// Strip characters that could end a declaration or the style element.
fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '{' | '}' | ';'))
        .collect()
}

/// Scoped stylesheet for overlay `id`.
#[must_use]
pub fn overlay_style(options: &LoaderOptions, id: u32) -> String {
    let art = artwork(options.skin);
    let scope = format!(".{OVERLAY_CLASS}[{SCOPE_ATTR}=\"{id}\"]");
    let background = css_value(&options.background);
    let text_color = css_value(&options.text_color);
    let z_index = options.z_index;
    let speed = options.wave_speed_sec;
    let shift = art.wave_shift;

    format!(
        "<style>\
{scope}{{position:fixed;inset:0;display:flex;align-items:center;justify-content:center;\
background:{background};z-index:{z_index};transition:opacity 400ms ease}}\
{scope}.{HIDE_CLASS}{{opacity:0;pointer-events:none}}\
{scope} .canload{{text-align:center;color:{text_color};\
font-family:system-ui,-apple-system,Segoe UI,Roboto,Helvetica,Arial,\"Noto Sans\";user-select:none}}\
{scope} .{PERCENT_CLASS}{{margin-top:12px;font-size:16px;font-weight:600;letter-spacing:0.4px}}\
{scope} .canload-wave{{transform-box:fill-box;animation:canload-wave-{id} {speed}s linear infinite}}\
@keyframes canload-wave-{id}{{from{{transform:translateX(0)}}to{{transform:translateX(-{shift}px)}}}}\
{scope} .{FILL_CLASS}{{transform-box:fill-box;transition:transform 420ms cubic-bezier(.22,.61,.36,1)}}\
@media (prefers-reduced-motion: reduce){{{scope} .canload-wave{{animation:none}}{scope} .{FILL_CLASS}{{transition:none}}}}\
</style>"
    )
}

fn container_shell(skin: Skin) -> &'static str {
    match skin {
        Skin::Can => concat!(
            r##"<rect x="50" y="50" width="100" height="200" rx="10" ry="10" fill="none" stroke="#999" stroke-width="2"/>"##,
            r##"<ellipse cx="100" cy="50" rx="50" ry="10" fill="#ccc" stroke="#999" stroke-width="2"/>"##,
            r##"<ellipse cx="100" cy="55" rx="48" ry="8" fill="#ddd"/>"##,
            r##"<ellipse cx="100" cy="250" rx="50" ry="10" fill="#ccc" stroke="#999" stroke-width="2"/>"##,
            r##"<ellipse cx="100" cy="245" rx="48" ry="8" fill="#ddd"/>"##,
            r##"<ellipse cx="100" cy="58" rx="45" ry="7" fill="#bbb"/>"##,
            r##"<line x1="150" y1="55" x2="150" y2="245" stroke="#aaa" stroke-width="0.5" stroke-dasharray="2,2"/>"##,
            r##"<ellipse cx="100" cy="265" rx="60" ry="8" fill="rgba(0,0,0,0.1)"/>"##,
        ),
        Skin::Cup => concat!(
            r##"<ellipse cx="100" cy="250" rx="50" ry="10" fill="#ccc" stroke="#999" stroke-width="2"/>"##,
            r##"<ellipse cx="100" cy="245" rx="48" ry="8" fill="#ddd"/>"##,
        ),
    }
}

fn container_overlay(skin: Skin) -> &'static str {
    match skin {
        Skin::Can => "",
        Skin::Cup => concat!(
            r##"<rect x="50" y="50" width="100" height="200" rx="10" ry="10" fill="none" stroke="#999" stroke-width="2"/>"##,
            r##"<ellipse cx="100" cy="50" rx="50" ry="10" fill="#ccc" stroke="#999" stroke-width="2"/>"##,
            r##"<ellipse cx="100" cy="55" rx="48" ry="8" fill="#ddd"/>"##,
            r##"<path d="M52,55 L52,245 Q52,248 55,250 L95,250 Q98,250 100,248 L100,52 Q100,50 98,52 L55,52 Q52,52 52,55 Z" fill="none" stroke="#fff" stroke-width="1" opacity="0.4"/>"##,
            r##"<line x1="150" y1="55" x2="150" y2="245" stroke="#aaa" stroke-width="0.5" stroke-dasharray="2,2"/>"##,
            r##"<ellipse cx="100" cy="265" rx="60" ry="8" fill="rgba(0,0,0,0.1)"/>"##,
        ),
    }
}

/// Container SVG and percentage label for overlay `id`.
pub fn overlay_body(options: &LoaderOptions, id: u32) -> Result<String, ColorParseError> {
    let liquid = options.liquid_color()?;
    let foam = liquid.lighten(FOAM_LIGHTEN_PERCENT);
    let skin = options.skin;
    let art = artwork(skin);
    let geometry: FillGeometry = skin.geometry();
    let clip_id = format!("canload-clip-{id}");
    let initial = geometry.transform_for(0);
    let label = options.label_for(0).unwrap_or_default();

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg width=\"200\" height=\"300\" viewBox=\"0 0 200 300\" \
         xmlns=\"http://www.w3.org/2000/svg\" aria-label=\"Loading {name}\">\
         <defs><clipPath id=\"{clip_id}\"><rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" \
         rx=\"{r}\" ry=\"{r}\"></rect></clipPath></defs>",
        name = skin.name(),
        x = art.clip_x,
        y = geometry.clip_y,
        w = art.clip_width,
        h = geometry.clip_height,
        r = art.clip_radius,
    );
    svg.push_str(container_shell(skin));
    let _ = write!(
        svg,
        "<g clip-path=\"url(#{clip_id})\"><g class=\"{FILL_CLASS}\" style=\"transform: {initial};\">\
         <g class=\"canload-wave\">\
         <path d=\"{liquid_d}\" fill=\"{liquid}\" opacity=\"0.92\"></path>\
         <path d=\"{foam_d}\" fill=\"{foam}\" opacity=\"0.65\"></path>\
         </g></g></g>",
        liquid_d = art.liquid.path(),
        foam_d = art.foam.path(),
    );
    svg.push_str(container_overlay(skin));
    svg.push_str("</svg>");

    Ok(format!(
        "<div class=\"canload\">{svg}<div class=\"{PERCENT_CLASS}\">{label}</div></div>"
    ))
}

/// Style and body for overlay `id`.
pub fn render_overlay(options: &LoaderOptions, id: u32) -> Result<OverlayMarkup, ColorParseError> {
    Ok(OverlayMarkup {
        style: overlay_style(options, id),
        body: overlay_body(options, id)?,
    })
}
