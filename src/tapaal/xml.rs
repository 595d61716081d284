// SPDX-License-Identifier: PMPL-1.0-or-later

//! TAPAAL PNML serialization

use super::net::{ArcKind, PetriNet};
use std::fmt::Write;

const PNML_NAMESPACE: &str = "http://www.informatik.hu-berlin.de/top/pnml/ptNetb";
const K_BOUND: u32 = 3;

pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn net_to_xml(net: &PetriNet) -> String {
    // fmt::Write on String is infallible
    let mut xml = String::new();
    let _ = writeln!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#
    );
    let _ = writeln!(xml, r#"<pnml xmlns="{}">"#, PNML_NAMESPACE);
    let _ = writeln!(
        xml,
        r#"  <net active="true" id="{}" type="P/T net">"#,
        xml_escape(&net.id)
    );
    let _ = writeln!(xml, "    <name><text>{}</text></name>", xml_escape(&net.name));

    for place in &net.places {
        let id = xml_escape(&place.id);
        let _ = writeln!(
            xml,
            r#"    <place displayName="true" id="{id}" initialMarking="{}" invariant="&lt; inf" name="{id}" nameOffsetX="0" nameOffsetY="0" positionX="{}.0" positionY="{}.0"/>"#,
            place.initial_marking,
            place.x,
            place.y,
        );
    }

    for transition in &net.transitions {
        let id = xml_escape(&transition.id);
        let _ = writeln!(
            xml,
            r#"    <transition angle="0" displayName="true" id="{id}" infiniteServer="false" name="{id}" nameOffsetX="0" nameOffsetY="0" player="0" positionX="{}.0" positionY="{}.0" priority="0" urgent="false"/>"#,
            transition.x,
            transition.y + 50,
        );
    }

    for arc in &net.arcs {
        let (inscription, kind) = match &arc.kind {
            ArcKind::Timed(interval) => (interval.inscription(), "timed"),
            ArcKind::Output => ("1".to_string(), "normal"),
            ArcKind::Inhibitor => ("[0,inf)".to_string(), "tapnInhibitor"),
        };
        let _ = writeln!(
            xml,
            r#"    <arc id="{}" inscription="{}" nameOffsetX="0" nameOffsetY="0" source="{}" target="{}" type="{}" weight="1"/>"#,
            xml_escape(&arc.id),
            xml_escape(&inscription),
            xml_escape(&arc.source),
            xml_escape(&arc.target),
            kind,
        );
    }

    let _ = writeln!(xml, "  </net>");
    let _ = writeln!(xml, r#"  <k-bound bound="{}"/>"#, K_BOUND);
    let _ = writeln!(xml, r#"  <feature isGame="false" isTimed="true"/>"#);
    let _ = writeln!(xml, "</pnml>");
    xml
}
