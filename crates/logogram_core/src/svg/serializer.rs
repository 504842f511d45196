//! String-building SVG serializer.

use crate::model::geometry::{ArcSegment, Connector, Geometry};
use crate::model::grapheme::Grapheme;
use crate::model::logogram::{Composition, Placement};
use std::f64::consts::PI;
use std::fmt::Write;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
const CANVAS_PX: u32 = 512;
const VIEW_BOX: &str = "-100 -100 200 200";
const INK: &str = "#1b1b1f";
const CONNECTOR_WIDTH_RATIO: f64 = 0.6;
const INDICATOR_OPACITY: f64 = 0.85;

/// Renders one grapheme as a standalone document.
pub fn render_grapheme(grapheme: &Grapheme) -> String {
    let mut svg = open_document(&grapheme.key);
    push_geometry(&mut svg, &grapheme.geometry);
    close_document(svg)
}

/// Renders a composed logogram.
///
/// Glyphs whose key is missing from `composition.graphemes` are skipped; the
/// composer always resolves every key before rendering.
pub fn render_composition(composition: &Composition) -> String {
    let mut svg = open_document(&composition.tokens.join(" "));

    for (index, layer) in composition.layers.iter().enumerate() {
        let _ = write!(
            svg,
            "<g class=\"layer\" data-index=\"{index}\"{}>",
            placement_attrs(&layer.placement)
        );
        for glyph in &layer.glyphs {
            let Some(grapheme) = composition.graphemes.get(&glyph.key) else {
                continue;
            };
            let _ = write!(
                svg,
                "<g class=\"glyph\" data-key=\"{}\"{}>",
                escape_xml(&glyph.key),
                placement_attrs(&glyph.placement)
            );
            push_geometry(&mut svg, &grapheme.geometry);
            svg.push_str("</g>");
        }
        svg.push_str("</g>");
    }

    if let Some(radius) = composition.center_indicator {
        let _ = write!(
            svg,
            "<circle class=\"indicator\" cx=\"0\" cy=\"0\" r=\"{}\" fill=\"{INK}\" fill-opacity=\"{}\" stroke=\"none\"/>",
            num(radius),
            num(INDICATOR_OPACITY)
        );
    }

    close_document(svg)
}

/// Returns every `d` attribute `push_geometry` emits, in emission order.
pub fn path_data(geometry: &Geometry) -> Vec<String> {
    let arcs = geometry
        .rings
        .iter()
        .flat_map(|ring| ring.segments.iter().map(move |s| arc_path(ring.radius, s)));
    let spokes = geometry
        .connectors
        .iter()
        .flat_map(|set| set.spokes.iter().map(connector_path));
    arcs.chain(spokes).collect()
}

fn open_document(title: &str) -> String {
    let mut svg = String::with_capacity(8 * 1024);
    svg.push_str(XML_DECLARATION);
    svg.push('\n');
    let _ = write!(
        svg,
        "<svg xmlns=\"{SVG_NAMESPACE}\" version=\"1.1\" width=\"{CANVAS_PX}\" height=\"{CANVAS_PX}\" viewBox=\"{VIEW_BOX}\" fill=\"none\" stroke=\"{INK}\" stroke-linecap=\"round\">"
    );
    let _ = write!(svg, "<title>{}</title>", escape_xml(title));
    svg
}

fn close_document(mut svg: String) -> String {
    svg.push_str("</svg>\n");
    svg
}

fn push_geometry(svg: &mut String, geometry: &Geometry) {
    let _ = write!(
        svg,
        "<g class=\"grapheme\" transform=\"rotate({})\">",
        num(geometry.rotation_deg)
    );

    for ring in &geometry.rings {
        let _ = write!(
            svg,
            "<g class=\"ring\" stroke-width=\"{}\" stroke-opacity=\"{}\"",
            num(ring.stroke_width),
            num(ring.opacity)
        );
        if let Some(dash) = ring.dash.dasharray() {
            let _ = write!(svg, " stroke-dasharray=\"{dash}\"");
        }
        svg.push('>');
        for segment in &ring.segments {
            let _ = write!(svg, "<path d=\"{}\"/>", arc_path(ring.radius, segment));
        }
        svg.push_str("</g>");
    }

    for set in &geometry.connectors {
        let outer = &geometry.rings[set.outer_ring];
        let _ = write!(
            svg,
            "<g class=\"connectors\" stroke-width=\"{}\" stroke-opacity=\"{}\">",
            num(outer.stroke_width * CONNECTOR_WIDTH_RATIO),
            num(outer.opacity)
        );
        for spoke in &set.spokes {
            let _ = write!(svg, "<path d=\"{}\"/>", connector_path(spoke));
        }
        svg.push_str("</g>");
    }

    let center = &geometry.center;
    let _ = write!(
        svg,
        "<circle class=\"center\" cx=\"0\" cy=\"0\" r=\"{}\" fill=\"{INK}\" fill-opacity=\"{}\" stroke=\"none\"/>",
        num(center.radius),
        num(center.opacity)
    );
    if let Some(halo) = center.halo_radius {
        let _ = write!(
            svg,
            "<circle class=\"halo\" cx=\"0\" cy=\"0\" r=\"{}\" stroke-width=\"1\" stroke-opacity=\"{}\"/>",
            num(halo),
            num(center.opacity)
        );
    }

    svg.push_str("</g>");
}

fn placement_attrs(placement: &Placement) -> String {
    format!(
        " transform=\"rotate({}) scale({})\" opacity=\"{}\"",
        num(placement.rotation_deg),
        num(placement.scale),
        num(placement.opacity)
    )
}

fn arc_path(radius: f64, segment: &ArcSegment) -> String {
    let end = segment.start + segment.sweep;
    let large_arc = u8::from(segment.sweep > PI);
    format!(
        "M {} {} A {r} {r} 0 {large_arc} 1 {} {}",
        num(radius * segment.start.cos()),
        num(radius * segment.start.sin()),
        num(radius * end.cos()),
        num(radius * end.sin()),
        r = num(radius),
    )
}

fn connector_path(connector: &Connector) -> String {
    let (sin, cos) = connector.angle.sin_cos();
    format!(
        "M {} {} L {} {}",
        num(connector.inner_radius * cos),
        num(connector.inner_radius * sin),
        num(connector.outer_radius * cos),
        num(connector.outer_radius * sin),
    )
}

/// Fixed three-decimal formatting; negative zero prints as `0.000`.
fn num(value: f64) -> String {
    let formatted = format!("{value:.3}");
    if formatted == "-0.000" {
        "0.000".to_string()
    } else {
        formatted
    }
}

/// Escapes markup characters and drops characters XML 1.0 cannot represent.
fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            ch if is_xml_char(ch) => escaped.push(ch),
            _ => {}
        }
    }
    escaped
}

fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{d7ff}' | '\u{e000}'..='\u{fffd}' | '\u{10000}'..='\u{10ffff}'
    )
}
