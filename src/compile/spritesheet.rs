//! Sprite-sheet compiler.
//!
//! ```xml
//! <spritesheets>
//!   <spritesheet name="dog" src="images/dog.png">
//!     <frames>
//!       <frame name="run0" x="0" y="0" w="32" h="32" t="100"/>
//!       <frame name="sky" fullTexture="true" t="0"/>
//!       <frame name="noise" code="return noise(t);" t="16"/>
//!     </frames>
//!     <layers>
//!       <layer name="body" x="0" y="0">
//!         <frame name="run0"/>
//!       </layer>
//!     </layers>
//!     <states>
//!       <state name="RunL" flip="x">
//!         <layer name="body"/>
//!       </state>
//!     </states>
//!   </spritesheet>
//! </spritesheets>
//! ```

use super::xml::{
    children, expect_root, first_child, optional_flag, parse_document, required_attr,
    required_number,
};
use super::{CompileError, CompileOutput, Warning};
use roxmltree::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Animation data for one sprite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spritesheet {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(
        rename = "positionBasedOptimizations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub position_based_optimizations: Option<bool>,
    pub frames: BTreeMap<String, Frame>,
    pub layers: BTreeMap<String, Layer>,
    pub states: BTreeMap<String, State>,
}

/// A single animation frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(flatten)]
    pub kind: FrameKind,
    /// Timing value
    pub t: f64,
}

/// Where a frame's pixels come from.
///
/// A `code` attribute wins over `fullTexture`, which wins over geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameKind {
    /// Procedurally generated frame
    Code { code: String },
    /// The whole source image
    FullTexture {
        #[serde(rename = "fullTexture")]
        full_texture: bool,
    },
    /// Rectangle of the source image
    Rect { x: f64, y: f64, w: f64, h: f64 },
}

/// A layer (body, arms, ...) cycling through frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Anchor offsets, kept exactly as written in the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    pub frames: Vec<String>,
}

/// A named animation state built from layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub layers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip: Option<String>,
}

/// Compile a `<spritesheets>` document.
pub fn compile_spritesheets(bytes: &[u8]) -> Result<CompileOutput<Vec<Spritesheet>>, CompileError> {
    let doc = parse_document(bytes)?;
    let root = expect_root(&doc, "spritesheets")?;

    let mut warnings = Vec::new();
    let sheets = children(root, "spritesheet")
        .map(|node| compile_spritesheet(node, &mut warnings))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompileOutput { value: sheets, warnings })
}

fn compile_spritesheet(
    node: Node<'_, '_>,
    warnings: &mut Vec<Warning>,
) -> Result<Spritesheet, CompileError> {
    let name = required_attr(node, "name")?.to_string();

    let mut frames = BTreeMap::new();
    for frame in children(first_child(node, "frames")?, "frame") {
        let frame_name = required_attr(frame, "name")?;
        insert_unique(&mut frames, "frame", frame_name, compile_frame(frame)?, &name)?;
    }

    let mut layers = BTreeMap::new();
    for layer in children(first_child(node, "layers")?, "layer") {
        let layer_name = required_attr(layer, "name")?;
        let compiled = Layer {
            x: layer.attribute("x").map(str::to_string),
            y: layer.attribute("y").map(str::to_string),
            frames: name_refs(layer, "frame")?,
        };
        for missing in compiled.frames.iter().filter(|f| !frames.contains_key(*f)) {
            warnings.push(Warning::new(format!(
                "spritesheet '{}': layer '{}' references undeclared frame '{}'",
                name, layer_name, missing
            )));
        }
        insert_unique(&mut layers, "layer", layer_name, compiled, &name)?;
    }

    let mut states = BTreeMap::new();
    for state in children(first_child(node, "states")?, "state") {
        let state_name = required_attr(state, "name")?;
        let compiled = State {
            layers: name_refs(state, "layer")?,
            flip: state.attribute("flip").map(str::to_string),
        };
        for missing in compiled.layers.iter().filter(|l| !layers.contains_key(*l)) {
            warnings.push(Warning::new(format!(
                "spritesheet '{}': state '{}' references undeclared layer '{}'",
                name, state_name, missing
            )));
        }
        insert_unique(&mut states, "state", state_name, compiled, &name)?;
    }

    Ok(Spritesheet {
        src: node.attribute("src").map(str::to_string),
        position_based_optimizations: optional_flag(node, "positionBasedOptimizations")?,
        name,
        frames,
        layers,
        states,
    })
}

fn compile_frame(node: Node<'_, '_>) -> Result<Frame, CompileError> {
    let kind = if let Some(code) = node.attribute("code") {
        FrameKind::Code { code: code.to_string() }
    } else if optional_flag(node, "fullTexture")? == Some(true) {
        FrameKind::FullTexture { full_texture: true }
    } else {
        FrameKind::Rect {
            x: required_number(node, "x")?,
            y: required_number(node, "y")?,
            w: required_number(node, "w")?,
            h: required_number(node, "h")?,
        }
    };

    Ok(Frame { kind, t: required_number(node, "t")? })
}

/// Collect the `name` attributes of child elements with a given tag.
fn name_refs(node: Node<'_, '_>, tag: &str) -> Result<Vec<String>, CompileError> {
    children(node, tag).map(|child| required_attr(child, "name").map(str::to_string)).collect()
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    kind: &'static str,
    key: &str,
    value: T,
    sheet: &str,
) -> Result<(), CompileError> {
    if map.contains_key(key) {
        return Err(CompileError::DuplicateName {
            kind,
            name: key.to_string(),
            sheet: sheet.to_string(),
        });
    }
    map.insert(key.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOG: &str = r#"<spritesheets>
        <spritesheet name="dog" src="images/dog.png" positionBasedOptimizations="false">
            <frames>
                <frame name="run0" x="0" y="0" w="32" h="32" t="100"/>
                <frame name="run1" x="32" y="0" w="32" h="32" t="100"/>
                <frame name="sky" fullTexture="true" t="0"/>
                <frame name="noise" code="noise()" x="1" y="2" w="3" h="4" t="16"/>
            </frames>
            <layers>
                <layer name="body" x="0" y="-4">
                    <frame name="run0"/>
                    <frame name="run1"/>
                </layer>
                <layer name="empty"/>
            </layers>
            <states>
                <state name="RunL" flip="x"><layer name="body"/></state>
                <state name="Idle"/>
            </states>
        </spritesheet>
    </spritesheets>"#;

    fn dog() -> CompileOutput<Vec<Spritesheet>> {
        compile_spritesheets(DOG.as_bytes()).unwrap()
    }

    #[test]
    fn test_sheet_attributes() {
        let out = dog();
        assert!(out.warnings.is_empty());
        let sheet = &out.value[0];
        assert_eq!(sheet.name, "dog");
        assert_eq!(sheet.src.as_deref(), Some("images/dog.png"));
        assert_eq!(sheet.position_based_optimizations, Some(false));
    }

    #[test]
    fn test_frame_variants() {
        let out = dog();
        let frames = &out.value[0].frames;
        assert_eq!(
            frames["run1"],
            Frame { kind: FrameKind::Rect { x: 32.0, y: 0.0, w: 32.0, h: 32.0 }, t: 100.0 }
        );
        assert_eq!(frames["sky"], Frame { kind: FrameKind::FullTexture { full_texture: true }, t: 0.0 });
    }

    #[test]
    fn test_code_frame_ignores_geometry() {
        let out = dog();
        let frame = &out.value[0].frames["noise"];
        assert_eq!(frame.kind, FrameKind::Code { code: "noise()".to_string() });
        assert_eq!(serde_json::to_value(frame).unwrap(), json!({"code": "noise()", "t": 16.0}));
    }

    #[test]
    fn test_full_texture_false_uses_geometry() {
        let xml = r#"<spritesheets><spritesheet name="s">
            <frames><frame name="f" fullTexture="false" x="1" y="2" w="3" h="4" t="5"/></frames>
            <layers/><states/>
        </spritesheet></spritesheets>"#;
        let out = compile_spritesheets(xml.as_bytes()).unwrap();
        assert!(matches!(out.value[0].frames["f"].kind, FrameKind::Rect { .. }));
    }

    #[test]
    fn test_layers_keep_raw_offsets() {
        let out = dog();
        let body = &out.value[0].layers["body"];
        assert_eq!(body.x.as_deref(), Some("0"));
        assert_eq!(body.y.as_deref(), Some("-4"));
        assert_eq!(body.frames, vec!["run0", "run1"]);
        assert!(out.value[0].layers["empty"].frames.is_empty());
    }

    #[test]
    fn test_states() {
        let out = dog();
        let states = &out.value[0].states;
        assert_eq!(states["RunL"].layers, vec!["body"]);
        assert_eq!(states["RunL"].flip.as_deref(), Some("x"));
        assert!(states["Idle"].layers.is_empty());
        assert_eq!(states["Idle"].flip, None);
        assert_eq!(serde_json::to_value(&states["Idle"]).unwrap(), json!({"layers": []}));
    }

    #[test]
    fn test_json_round_trip() {
        let out = dog();
        let json = serde_json::to_string(&out.value).unwrap();
        let parsed: Vec<Spritesheet> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, out.value);
    }

    #[test]
    fn test_missing_block_is_an_error() {
        let xml = r#"<spritesheets><spritesheet name="s"><frames/><layers/></spritesheet></spritesheets>"#;
        let err = compile_spritesheets(xml.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), r#"<spritesheet "s"> has no <states> element"#);
    }

    #[test]
    fn test_duplicate_frame_is_an_error() {
        let xml = r#"<spritesheets><spritesheet name="s">
            <frames><frame name="a" fullTexture="1" t="0"/><frame name="a" fullTexture="1" t="1"/></frames>
            <layers/><states/>
        </spritesheet></spritesheets>"#;
        let err = compile_spritesheets(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateName { kind: "frame", .. }));
    }

    #[test]
    fn test_dangling_references_are_warnings() {
        let xml = r#"<spritesheets><spritesheet name="s">
            <frames/>
            <layers><layer name="l"><frame name="ghost"/></layer></layers>
            <states><state name="st"><layer name="nope"/></state></states>
        </spritesheet></spritesheets>"#;
        let out = compile_spritesheets(xml.as_bytes()).unwrap();
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings[0].message.contains("'ghost'"));
        assert!(out.warnings[1].message.contains("'nope'"));
    }

    #[test]
    fn test_only_first_block_is_read() {
        let xml = r#"<spritesheets><spritesheet name="s">
            <frames><frame name="a" fullTexture="true" t="0"/></frames>
            <frames><frame name="b" fullTexture="true" t="0"/></frames>
            <layers/><states/>
        </spritesheet></spritesheets>"#;
        let out = compile_spritesheets(xml.as_bytes()).unwrap();
        assert_eq!(out.value[0].frames.keys().collect::<Vec<_>>(), vec!["a"]);
    }
}
