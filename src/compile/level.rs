//! Level compiler.
//!
//! ```xml
//! <levels>
//!   <level id="main">
//!     <object name="dog" type="Dog" spritesheet="dog" x="10" y="20" vars='{"speed": 3}'/>
//!     <object name="hero" x="0" y="0" z="1" static="true">
//!       <type id="Walker"/>
//!       <type id="Talker"/>
//!     </object>
//!   </level>
//! </levels>
//! ```

use super::xml::{
    children, describe, expect_root, optional_flag, optional_number, parse_document,
    required_attr, required_number,
};
use super::{CompileError, CompileOutput, Warning};
use roxmltree::Node;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One playable level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    pub objects: Vec<LevelObject>,
}

/// How an object declares its behavioural type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectType {
    /// Inherits from a single type (`type="Enemy"`)
    Single(String),
    /// Composes several types (nested `<type id="..."/>` elements)
    Composite(Vec<String>),
}

/// A game object placed in a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelObject {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub sprite: Option<String>,
    pub isstatic: Option<bool>,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub vars: Map<String, Value>,
}

/// Compile a `<levels>` document.
pub fn compile_levels(bytes: &[u8]) -> Result<CompileOutput<Vec<Level>>, CompileError> {
    let doc = parse_document(bytes)?;
    let root = expect_root(&doc, "levels")?;

    let mut warnings = Vec::new();
    let levels = children(root, "level")
        .map(|node| compile_level(node, &mut warnings))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompileOutput { value: levels, warnings })
}

fn compile_level(node: Node<'_, '_>, warnings: &mut Vec<Warning>) -> Result<Level, CompileError> {
    let id = required_attr(node, "id")?.to_string();
    let objects = children(node, "object")
        .map(|object| compile_object(object, &id, warnings))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Level { id, objects })
}

fn compile_object(
    node: Node<'_, '_>,
    level_id: &str,
    warnings: &mut Vec<Warning>,
) -> Result<LevelObject, CompileError> {
    let name = required_attr(node, "name")?.to_string();

    let composed: Vec<String> = children(node, "type")
        .map(|t| required_attr(t, "id").map(str::to_string))
        .collect::<Result<_, _>>()?;
    let object_type = if composed.is_empty() {
        ObjectType::Single(required_attr(node, "type")?.to_string())
    } else {
        ObjectType::Composite(composed)
    };

    let vars = match node.attribute("vars") {
        Some(raw) => parse_vars(raw).unwrap_or_else(|reason| {
            warnings.push(Warning::new(format!(
                "level '{}': {} has malformed vars {:?} ({}); using {{}}",
                level_id,
                describe(node),
                raw,
                reason
            )));
            Map::new()
        }),
        None => Map::new(),
    };

    let isstatic = optional_flag(node, "static").unwrap_or_else(|e| {
        warnings.push(Warning::new(format!("level '{}': {}; using null", level_id, e)));
        None
    });

    Ok(LevelObject {
        name,
        object_type,
        sprite: node.attribute("spritesheet").map(str::to_string),
        isstatic,
        x: required_number(node, "x")?,
        y: required_number(node, "y")?,
        z: optional_number(node, "z")?,
        vars,
    })
}

/// Parse the embedded JSON of a `vars` attribute into a key/value map.
fn parse_vars(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, found {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(xml: &str) -> CompileOutput<Vec<Level>> {
        compile_levels(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_objects_keep_source_order() {
        let out = compile(
            r#"<levels><level id="1">
                <object name="a" type="T" x="1" y="1"/>
                <object name="b" type="T" x="2" y="2"/>
                <object name="c" type="T" x="3" y="3"/>
            </level></levels>"#,
        );
        let names: Vec<&str> = out.value[0].objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_multiple_levels() {
        let out = compile(r#"<levels><level id="1"/><level id="2"/></levels>"#);
        let ids: Vec<&str> = out.value.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(out.value.iter().all(|l| l.objects.is_empty()));
    }

    #[test]
    fn test_inheritance_type() {
        let out = compile(r#"<levels><level id="1"><object name="e" type="Enemy" x="0" y="0"/></level></levels>"#);
        assert_eq!(out.value[0].objects[0].object_type, ObjectType::Single("Enemy".to_string()));
    }

    #[test]
    fn test_composition_type() {
        let out = compile(
            r#"<levels><level id="1">
                <object name="e" type="Ignored" x="0" y="0"><type id="A"/><type id="B"/></object>
            </level></levels>"#,
        );
        assert_eq!(
            out.value[0].objects[0].object_type,
            ObjectType::Composite(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_missing_type_is_an_error() {
        let err = compile_levels(br#"<levels><level id="1"><object name="e" x="0" y="0"/></level></levels>"#)
            .unwrap_err();
        assert!(matches!(err, CompileError::MissingAttribute { ref attribute, .. } if attribute == "type"));
    }

    #[test]
    fn test_optional_fields() {
        let out = compile(
            r#"<levels><level id="1">
                <object name="a" type="T" x="1.5" y=" 2 "/>
                <object name="b" type="T" x="1" y="2" z="3" spritesheet="dog" static="true"/>
            </level></levels>"#,
        );
        let a = &out.value[0].objects[0];
        assert_eq!((a.x, a.y), (1.5, 2.0));
        assert_eq!(a.z, None);
        assert_eq!(a.sprite, None);
        assert_eq!(a.isstatic, None);
        assert!(a.vars.is_empty());

        let b = &out.value[0].objects[1];
        assert_eq!(b.z, Some(3.0));
        assert_eq!(b.sprite.as_deref(), Some("dog"));
        assert_eq!(b.isstatic, Some(true));
    }

    #[test]
    fn test_unreadable_static_flag_is_a_warning() {
        let out = compile(
            r#"<levels><level id="1">
                <object name="a" type="T" x="0" y="0" static="sometimes"/>
                <object name="b" type="T" x="0" y="0" static="no"/>
            </level></levels>"#,
        );
        assert_eq!(out.value[0].objects[0].isstatic, None);
        assert_eq!(out.value[0].objects[1].isstatic, Some(false));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].message.contains("sometimes"));
    }

    #[test]
    fn test_non_numeric_coordinate_is_an_error() {
        let err = compile_levels(
            br#"<levels><level id="1"><object name="a" type="T" x="left" y="0"/></level></levels>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("x=\"left\""));
    }

    #[test]
    fn test_vars_parsed() {
        let out = compile(
            r#"<levels><level id="1"><object name="a" type="T" x="0" y="0" vars='{"speed": 3, "tag": "x"}'/></level></levels>"#,
        );
        let vars = &out.value[0].objects[0].vars;
        assert_eq!(vars.get("speed"), Some(&json!(3)));
        assert_eq!(vars.get("tag"), Some(&json!("x")));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_malformed_vars_is_a_warning() {
        let out = compile(
            r#"<levels><level id="1"><object name="a" type="T" x="0" y="0" vars="{bad json"/></level></levels>"#,
        );
        assert!(out.value[0].objects[0].vars.is_empty());
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].message.contains("{bad json"));
        assert!(out.warnings[0].message.contains(r#"<object "a">"#));
    }

    #[test]
    fn test_non_object_vars_is_a_warning() {
        let out = compile(
            r#"<levels><level id="1"><object name="a" type="T" x="0" y="0" vars="[1, 2]"/></level></levels>"#,
        );
        assert!(out.value[0].objects[0].vars.is_empty());
        assert!(out.warnings[0].message.contains("an array"));
    }

    #[test]
    fn test_json_shape() {
        let out = compile(
            r#"<levels><level id="1"><object name="a" x="1" y="2"><type id="A"/></object></level></levels>"#,
        );
        let json = serde_json::to_value(&out.value).unwrap();
        assert_eq!(
            json,
            json!([{
                "id": "1",
                "objects": [{
                    "name": "a",
                    "type": ["A"],
                    "sprite": null,
                    "isstatic": null,
                    "x": 1.0,
                    "y": 2.0,
                    "z": null,
                    "vars": {}
                }]
            }])
        );
    }

    #[test]
    fn test_wrong_root() {
        let err = compile_levels(b"<spritesheets/>").unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedRoot { .. }));
    }
}
