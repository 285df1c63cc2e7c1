//! Horizontal bar charts rendered as inline SVG.

use crate::html::escape;

const LABEL_WIDTH: f64 = 240.0;
const PLOT_WIDTH: f64 = 420.0;
const VALUE_WIDTH: f64 = 60.0;
const ROW_HEIGHT: f64 = 22.0;
const BAR_HEIGHT: f64 = 16.0;
const TOP_PADDING: f64 = 8.0;

/// Labels longer than this are shortened with an ellipsis. The full label
/// stays available as a tooltip.
const MAX_LABEL_CHARS: usize = 34;

/// One bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    /// Category label.
    pub label: String,
    /// Bar length.
    pub value: u64,
}

/// Renders bars top to bottom in the given order.
///
/// An empty input renders a short placeholder instead of an empty plot.
#[must_use]
pub fn bar_chart(aria_label: &str, bars: &[Bar], fill: &str) -> String {
    if bars.is_empty() {
        return "<p class=\"empty\">No data.</p>".to_string();
    }

    let max = bars.iter().map(|b| b.value).max().unwrap_or(0).max(1);
    let width = LABEL_WIDTH + PLOT_WIDTH + VALUE_WIDTH;
    #[allow(clippy::cast_precision_loss)]
    let height = ROW_HEIGHT.mul_add(bars.len() as f64, TOP_PADDING * 2.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg class="chart" role="img" aria-label="{}" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}">"#,
        escape(aria_label),
    ));

    for (i, bar) in bars.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = ROW_HEIGHT.mul_add(i as f64, TOP_PADDING);
        #[allow(clippy::cast_precision_loss)]
        let bar_width = PLOT_WIDTH * (bar.value as f64) / (max as f64);
        let text_y = y + BAR_HEIGHT - 4.0;

        svg.push_str(&format!(
            r#"<g><title>{title}: {value}</title><text x="{lx:.1}" y="{text_y:.1}" text-anchor="end" class="label">{label}</text><rect x="{LABEL_WIDTH:.1}" y="{y:.1}" width="{bar_width:.1}" height="{BAR_HEIGHT:.1}" fill="{fill}"/><text x="{vx:.1}" y="{text_y:.1}" class="value">{value}</text></g>"#,
            title = escape(&bar.label),
            value = bar.value,
            lx = LABEL_WIDTH - 6.0,
            label = escape(&shorten(&bar.label)),
            vx = LABEL_WIDTH + bar_width + 4.0,
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn shorten(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let mut short: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        short.push('…');
        short
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(label: &str, value: u64) -> Bar {
        Bar {
            label: label.to_string(),
            value,
        }
    }

    #[test]
    fn one_rect_per_bar_in_order() {
        let svg = bar_chart("Richness", &[bar("Alpha", 3), bar("Beta", 1)], "#123456");
        assert_eq!(svg.matches("<rect").count(), 2);
        let alpha = svg.find(">Alpha<").unwrap();
        let beta = svg.find(">Beta<").unwrap();
        assert!(alpha < beta);
    }

    #[test]
    fn longest_bar_spans_plot_width() {
        let svg = bar_chart("Richness", &[bar("Alpha", 4), bar("Beta", 2)], "#123456");
        assert!(svg.contains(r#"width="420.0""#));
        assert!(svg.contains(r#"width="210.0""#));
    }

    #[test]
    fn zero_values_render_empty_bars() {
        let svg = bar_chart("Richness", &[bar("Alpha", 0)], "#123456");
        assert!(svg.contains(r#"width="0.0""#));
    }

    #[test]
    fn labels_are_escaped_and_shortened() {
        let long = "Refugio Nacional de Vida Silvestre <Caño Negro> & alrededores";
        let svg = bar_chart("x", &[bar(long, 1)], "#000");
        assert!(!svg.contains("<Caño"));
        assert!(svg.contains("&lt;Caño Negro&gt; &amp; alrededores: 1</title>"));
        assert!(svg.contains('…'));
    }

    #[test]
    fn empty_input_renders_placeholder() {
        assert!(bar_chart("x", &[], "#000").contains("No data."));
    }
}
