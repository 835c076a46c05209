use std::collections::HashMap;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Weight};

const ELLIPSIS: char = '…';

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    font_size_bits: u32,
    is_bold: bool,
}

pub trait TextMeasure {
    /// Advance width of a single line of text.
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> f32;
}

/// Shapes text with the system fonts through cosmic-text.
pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: HashMap<MeasureKey, f32>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            cache: HashMap::new(),
        }
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> f32 {
        let key = MeasureKey {
            text: text.to_string(),
            font_size_bits: font_size.to_bits(),
            is_bold,
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height: font_size * 1.2,
            },
        );
        buffer.set_size(&mut self.font_system, None, None);

        let attrs = Attrs::new().family(Family::SansSerif).weight(if is_bold {
            Weight::BOLD
        } else {
            Weight::NORMAL
        });
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let width = buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0_f32, f32::max);

        self.cache.insert(key, width);
        width
    }
}

/// Fixed-advance estimate, independent of installed fonts.
#[derive(Debug, Clone, Copy)]
pub struct FixedMeasure {
    pub advance: f32,
}

impl Default for FixedMeasure {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasure for FixedMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> f32 {
        let weight = if is_bold { 1.05 } else { 1.0 };
        text.chars().count() as f32 * font_size * self.advance * weight
    }
}

/// Shorten `text` with a trailing ellipsis until it fits `max_width`.
pub fn fit_text<T: TextMeasure>(
    measure: &mut T,
    text: &str,
    font_size: f32,
    is_bold: bool,
    max_width: f32,
) -> String {
    if measure.measure_text(text, font_size, is_bold) <= max_width {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let (mut lo, mut hi) = (0usize, chars.len());
    // Largest prefix that still fits together with the ellipsis.
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        let candidate: String = chars[..mid].iter().chain(std::iter::once(&ELLIPSIS)).collect();
        if measure.measure_text(&candidate, font_size, is_bold) <= max_width {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    let mut fitted: String = chars[..lo].iter().collect::<String>().trim_end().to_string();
    fitted.push(ELLIPSIS);
    fitted
}
