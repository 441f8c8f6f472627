//! Built-in ASS renderer for danmaku tracks.
//!
//! Comments are laid out on a 1920x1080 canvas. Scrolling comments move
//! right to left over `speed` seconds; top and bottom comments stay put for
//! a fixed time. A comment that finds no free lane is dropped.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Danmaku, DanmakuComment};

use super::library_events::{AssOptions, DanmuRenderer, DownloadError};

const PLAY_RES_X: i32 = 1920;
const PLAY_RES_Y: i32 = 1080;
const DEFAULT_FONT: &str = "Microsoft YaHei";
const DEFAULT_FONT_SIZE: i32 = 50;
const DEFAULT_LINE_COUNT: i32 = 12;
const DEFAULT_SCROLL_SECS: i32 = 8;
const FIXED_SECS: f64 = 4.0;

static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{Extended_Pictographic}\x{FE0F}\x{200D}]").expect("Invalid emoji pattern")
});

#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    Scroll,
    Top,
    Bottom,
}

impl Placement {
    fn of(comment: &DanmakuComment) -> Self {
        match comment.mode {
            4 => Placement::Bottom,
            5 => Placement::Top,
            _ => Placement::Scroll,
        }
    }
}

/// Resolved layout parameters
struct Layout {
    font: String,
    font_size: i32,
    lanes: usize,
    scroll_secs: f64,
    alpha: u8,
}

impl Layout {
    fn new(options: &AssOptions) -> Self {
        let font_size = options.font_size.filter(|s| *s > 0).unwrap_or(DEFAULT_FONT_SIZE);
        let max_lanes = (PLAY_RES_Y / font_size).max(1);
        let lanes = options
            .line_count
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LINE_COUNT)
            .min(max_lanes);
        let opacity = options.text_opacity.unwrap_or(1.0).clamp(0.0, 1.0);

        Self {
            font: options.font.clone().unwrap_or_else(|| DEFAULT_FONT.to_string()),
            font_size,
            lanes: lanes as usize,
            scroll_secs: f64::from(options.speed.filter(|s| *s > 0).unwrap_or(DEFAULT_SCROLL_SECS)),
            alpha: ((1.0 - opacity) * 255.0).round() as u8,
        }
    }

    /// Rough rendered width: CJK glyphs are square, ASCII is half width.
    fn text_width(&self, text: &str) -> f64 {
        let units: f64 = text.chars().map(|c| if c.is_ascii() { 0.5 } else { 1.0 }).sum();
        units * f64::from(self.font_size)
    }
}

/// Time at which each lane accepts a new comment
struct Lanes {
    free_at: Vec<f64>,
}

impl Lanes {
    fn new(count: usize) -> Self {
        Self {
            free_at: vec![f64::MIN; count],
        }
    }

    fn take(&mut self, start: f64, busy_until: f64) -> Option<usize> {
        let lane = self.free_at.iter().position(|free| *free <= start)?;
        self.free_at[lane] = busy_until;
        Some(lane)
    }
}

#[derive(Debug, Default)]
pub struct AssRenderer;

impl AssRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl DanmuRenderer for AssRenderer {
    fn render(&self, danmaku: &Danmaku, options: &AssOptions) -> Result<String, DownloadError> {
        let layout = Layout::new(options);
        let mut script = header(&options.title, &layout);

        let mut comments: Vec<&DanmakuComment> = danmaku.items.iter().collect();
        comments.sort_by_key(|c| c.progress_ms);

        let mut scroll = Lanes::new(layout.lanes);
        let mut top = Lanes::new(layout.lanes);
        let mut bottom = Lanes::new(layout.lanes);
        let mut dropped = 0;

        for comment in comments {
            let text = clean_text(&comment.content, options.remove_emoji);
            if text.is_empty() {
                continue;
            }

            let start = comment.progress_ms as f64 / 1000.0;
            let placement = Placement::of(comment);
            let written = match placement {
                Placement::Scroll => {
                    let width = layout.text_width(&text);
                    // The lane frees up once the tail has fully entered the screen
                    let entered = layout.scroll_secs * width / (f64::from(PLAY_RES_X) + width);
                    scroll.take(start, start + entered).map(|lane| {
                        let y = lane_y(&layout, lane);
                        let effect = format!(
                            "\\move({},{},{},{})",
                            PLAY_RES_X,
                            y,
                            -(width.ceil() as i64),
                            y
                        );
                        (start + layout.scroll_secs, "Scroll", effect)
                    })
                }
                Placement::Top => top.take(start, start + FIXED_SECS).map(|lane| {
                    let effect = format!("\\an8\\pos({},{})", PLAY_RES_X / 2, lane_y(&layout, lane));
                    (start + FIXED_SECS, "Fixed", effect)
                }),
                Placement::Bottom => bottom.take(start, start + FIXED_SECS).map(|lane| {
                    let y = PLAY_RES_Y - (lane as i32 * layout.font_size);
                    let effect = format!("\\an2\\pos({},{})", PLAY_RES_X / 2, y);
                    (start + FIXED_SECS, "Fixed", effect)
                }),
            };

            let Some((end, style, effect)) = written else {
                dropped += 1;
                continue;
            };

            let _ = writeln!(
                script,
                "Dialogue: 2,{},{},{},,0000,0000,0000,,{{{}{}}}{}",
                format_time(start),
                format_time(end),
                style,
                effect,
                color_override(comment.color),
                text
            );
        }

        if dropped > 0 {
            tracing::debug!("{} comments of {} found no free lane", dropped, options.title);
        }
        Ok(script)
    }
}

fn header(title: &str, layout: &Layout) -> String {
    let mut header = String::new();
    let _ = writeln!(header, "[Script Info]");
    let _ = writeln!(header, "Title: {}", title);
    let _ = writeln!(header, "ScriptType: v4.00+");
    let _ = writeln!(header, "WrapStyle: 2");
    let _ = writeln!(header, "ScaledBorderAndShadow: yes");
    let _ = writeln!(header, "PlayResX: {}", PLAY_RES_X);
    let _ = writeln!(header, "PlayResY: {}", PLAY_RES_Y);
    let _ = writeln!(header);
    let _ = writeln!(header, "[V4+ Styles]");
    let _ = writeln!(
        header,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    );
    for name in ["Scroll", "Fixed"] {
        let _ = writeln!(
            header,
            "Style: {},{},{},&H{:02X}FFFFFF,&H{:02X}FFFFFF,&H{:02X}000000,&H{:02X}000000,0,0,0,0,100,100,0,0,1,1,0,7,0,0,0,1",
            name, layout.font, layout.font_size, layout.alpha, layout.alpha, layout.alpha, layout.alpha
        );
    }
    let _ = writeln!(header);
    let _ = writeln!(header, "[Events]");
    let _ = writeln!(
        header,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    );
    header
}

fn lane_y(layout: &Layout, lane: usize) -> i32 {
    lane as i32 * layout.font_size
}

/// `H:MM:SS.cc`
fn format_time(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as i64;
    format!(
        "{}:{:02}:{:02}.{:02}",
        centis / 360_000,
        (centis / 6_000) % 60,
        (centis / 100) % 60,
        centis % 100
    )
}

/// White is the style default and needs no override.
fn color_override(rgb: u32) -> String {
    let rgb = rgb & 0xFF_FFFF;
    if rgb == 0xFF_FFFF {
        return String::new();
    }
    let (r, g, b) = ((rgb >> 16) & 0xFF, (rgb >> 8) & 0xFF, rgb & 0xFF);
    format!("\\c&H{:02X}{:02X}{:02X}&", b, g, r)
}

fn clean_text(content: &str, remove_emoji: bool) -> String {
    let text = if remove_emoji {
        EMOJI_RE.replace_all(content, "").into_owned()
    } else {
        content.to_string()
    };
    text.trim()
        .replace('\\', "＼")
        .replace('{', "｛")
        .replace('}', "｝")
        .replace(['\r', '\n'], " ")
}
