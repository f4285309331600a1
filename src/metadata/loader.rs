//! XML program description loader.
//!
//! The description lists every type with an explicit metadata token, so the hex-encoded method
//! bodies can reference members by the same tokens a compiler would have emitted:
//!
//! ```xml
//! <program>
//!   <type token="0x02000001" namespace="System" name="Object" flags="public"/>
//!   <type token="0x02000002" namespace="Demo" name="Program" base="System.Object">
//!     <field token="0x04000001" name="counter" type="System.Int32" static="true"/>
//!     <method token="0x06000001" name="Main" flags="public static" maxstack="8" initlocals="true">
//!       <param type="System.String[]"/>
//!       <code>72 01 00 00 70 28 02 00 00 06 2A</code>
//!     </method>
//!     <constructor token="0x06000003" maxstack="8">
//!       <code>02 28 04 00 00 06 2A</code>
//!     </constructor>
//!   </type>
//!   <string token="0x70000001">Hello</string>
//! </program>
//! ```
//!
//! Type references (`base`, `element`, `type`, `returns`, `<implements type=..>`) accept either
//! a full type name or a token. Array types are declared with `element=".."` and get the
//! element name with a `[]` suffix unless a `name` is given.

use std::collections::HashMap;

use crate::{
    metadata::{
        defs::{MethodBody, ParamDef},
        flags::{
            method_flags_from_keywords, param_flags_from_keywords, type_flags_from_keywords,
            MethodModifiers, TypeFlags,
        },
        store::{MetadataBuilder, ProgramMetadata},
        token::Token,
    },
    utils::XmlNode,
    Result,
};

const DEFAULT_MAX_STACK: u32 = 8;

pub(crate) fn load_program(source: &str) -> Result<ProgramMetadata> {
    let root = XmlNode::parse(source)?;
    if root.name != "program" {
        return Err(config_error!(
            "Expected <program> root element, found <{}>",
            root.name
        ));
    }

    let names = collect_type_names(&root)?;
    let lookup = |text: &str| -> Result<Token> {
        if is_token(text) {
            return Token::parse(text);
        }
        names
            .by_name
            .get(text)
            .copied()
            .ok_or_else(|| config_error!("Unknown type '{}'", text))
    };

    let mut builder = MetadataBuilder::new();
    for node in root.children_named("type") {
        load_type(&mut builder, node, &names, &lookup)?;
    }
    for node in root.children_named("string") {
        let token = Token::parse(node.required("token")?)?;
        builder.define_string(token, &node.text);
    }

    let metadata = builder.build()?;
    log::debug!(
        "Loaded program description: {} types, {} callables",
        metadata.type_count(),
        metadata.callable_count()
    );
    Ok(metadata)
}

struct TypeNames {
    by_name: HashMap<String, Token>,
    arrays: HashMap<Token, (String, String)>,
}

fn is_token(text: &str) -> bool {
    text.starts_with("0x") || text.starts_with(|c: char| c.is_ascii_digit())
}

fn collect_type_names(root: &XmlNode) -> Result<TypeNames> {
    let mut by_name = HashMap::new();
    let mut by_token = HashMap::new();

    for node in root.children_named("type") {
        if node.attr("element").is_none() {
            let token = Token::parse(node.required("token")?)?;
            let namespace = node.attr("namespace").unwrap_or_default().to_string();
            let name = node.required("name")?.to_string();
            by_name.insert(qualified(&namespace, &name), token);
            by_token.insert(token, (namespace, name));
        }
    }

    // Array names derive from their element, which may itself be referenced by token
    let mut arrays = HashMap::new();
    for node in root.children_named("type") {
        let Some(element) = node.attr("element") else {
            continue;
        };
        let token = Token::parse(node.required("token")?)?;
        let element = if is_token(element) {
            Token::parse(element)?
        } else {
            by_name
                .get(element)
                .copied()
                .ok_or_else(|| config_error!("Unknown type '{}'", element))?
        };
        let (namespace, name) = match (node.attr("name"), by_token.get(&element)) {
            (Some(name), _) => (
                node.attr("namespace").unwrap_or_default().to_string(),
                name.to_string(),
            ),
            (None, Some((namespace, name))) => (namespace.clone(), format!("{name}[]")),
            (None, None) => return Err(config_error!("Unknown array element type {}", element)),
        };
        by_name.insert(qualified(&namespace, &name), token);
        arrays.insert(token, (namespace, name));
    }

    Ok(TypeNames { by_name, arrays })
}

fn qualified(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

fn load_type(
    builder: &mut MetadataBuilder,
    node: &XmlNode,
    names: &TypeNames,
    lookup: &dyn Fn(&str) -> Result<Token>,
) -> Result<()> {
    let token = Token::parse(node.required("token")?)?;
    let base = node.attr("base").map(lookup).transpose()?;

    match (node.attr("element"), names.arrays.get(&token)) {
        (Some(element), Some((namespace, name))) => {
            builder.define_type(token, namespace, name, TypeFlags::PUBLIC, base);
            builder.set_element_type(token, lookup(element)?);
        }
        _ => {
            let flags = type_flags_from_keywords(node.attr("flags").unwrap_or("public"))?;
            builder.define_type(
                token,
                node.attr("namespace").unwrap_or_default(),
                node.required("name")?,
                flags,
                base,
            );
        }
    }

    for child in &node.children {
        match child.name.as_str() {
            "implements" => builder.add_interface(token, lookup(child.required("type")?)?),
            "field" => {
                builder.define_field(
                    Token::parse(child.required("token")?)?,
                    token,
                    child.required("name")?,
                    lookup(child.required("type")?)?,
                    child.flag("static")?,
                );
            }
            "method" => {
                let flags = method_flags_from_keywords(child.attr("flags").unwrap_or("public"))?;
                let returns = match child.attr("returns") {
                    None | Some("void" | "System.Void") => None,
                    Some(ret) => Some(lookup(ret)?),
                };
                builder.define_method(
                    Token::parse(child.required("token")?)?,
                    token,
                    child.required("name")?,
                    flags,
                    returns,
                    load_params(child, lookup)?,
                    load_body(child)?,
                );
            }
            "constructor" => {
                let is_static = child.flag("static")?
                    || child
                        .attr("flags")
                        .map(method_flags_from_keywords)
                        .transpose()?
                        .is_some_and(|f| MethodModifiers::from_method_flags(f).contains(MethodModifiers::STATIC));
                builder.define_constructor(
                    Token::parse(child.required("token")?)?,
                    token,
                    is_static,
                    load_params(child, lookup)?,
                    load_body(child)?,
                );
            }
            other => {
                return Err(config_error!(
                    "Unexpected <{}> inside type '{}'",
                    other,
                    node.attr("name").unwrap_or_default()
                ))
            }
        }
    }

    Ok(())
}

fn load_params(node: &XmlNode, lookup: &dyn Fn(&str) -> Result<Token>) -> Result<Vec<ParamDef>> {
    node.children_named("param")
        .map(|param| {
            let flags = param_flags_from_keywords(param.attr("flags").unwrap_or_default())?;
            Ok(ParamDef::with_flags(lookup(param.required("type")?)?, flags))
        })
        .collect()
}

fn load_body(node: &XmlNode) -> Result<Option<MethodBody>> {
    let Some(code) = node.children_named("code").next() else {
        return Ok(None);
    };

    let max_stack = match node.attr("maxstack") {
        Some(text) => text
            .parse::<u32>()
            .map_err(|_| config_error!("Invalid maxstack '{}'", text))?,
        None => DEFAULT_MAX_STACK,
    };

    Ok(Some(MethodBody::new(
        max_stack,
        node.flag("initlocals")?,
        parse_hex(&code.text)?,
    )))
}

/// Decodes hex digits, ignoring any whitespace between them.
fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(config_error!("Odd number of hex digits in method body"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).unwrap_or_default();
            u8::from_str_radix(pair, 16)
                .map_err(|_| config_error!("Invalid hex byte '{}' in method body", pair))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataProvider;

    const PROGRAM: &str = r#"
        <program>
          <type token="0x02000001" namespace="System" name="Object"/>
          <type token="0x02000002" namespace="System" name="String" base="System.Object"/>
          <type token="0x02000003" element="System.String" base="System.Object"/>
          <type token="0x02000004" namespace="Demo" name="IGreeter" flags="public interface">
            <method token="0x06000010" name="Greet" flags="public virtual abstract newslot"/>
          </type>
          <type token="0x02000005" namespace="Demo" name="Program" base="0x02000001">
            <implements type="Demo.IGreeter"/>
            <field token="0x04000001" name="count" type="System.Object" static="true"/>
            <method token="0x06000001" name="Main" flags="public static" maxstack="2" initlocals="true">
              <param type="System.String[]"/>
              <code>
                72 01 00 00 70
                26 2A
              </code>
            </method>
            <method token="0x06000002" name="Greet" flags="public virtual final newslot" returns="void">
              <code>2A</code>
            </method>
            <constructor token="0x06000003">
              <param type="System.String" flags="in"/>
              <code>2A</code>
            </constructor>
            <constructor token="0x06000004" static="true">
              <code>2A</code>
            </constructor>
          </type>
          <string token="0x70000001">Hello &amp; welcome</string>
        </program>"#;

    #[test]
    fn load_full_program() {
        let metadata = load_program(PROGRAM).unwrap();
        assert_eq!(metadata.type_count(), 5);

        let array = metadata.find_type("System.String[]").unwrap();
        assert_eq!(array.token, Token(0x0200_0003));
        assert_eq!(array.element, Some(Token(0x0200_0002)));

        let program = metadata.find_type("Demo.Program").unwrap();
        assert_eq!(program.base, Some(Token(0x0200_0001)));
        assert_eq!(program.interfaces, vec![Token(0x0200_0004)]);
        assert_eq!(program.fields.len(), 1);
        assert_eq!(program.constructors.len(), 2);

        let main = metadata.method(Token(0x0600_0001)).unwrap();
        assert!(main.is_static());
        assert_eq!(main.params[0].param_type, Token(0x0200_0003));
        let body = main.body.as_ref().unwrap();
        assert_eq!(body.max_stack, 2);
        assert!(body.init_locals);
        assert_eq!(body.code, vec![0x72, 0x01, 0x00, 0x00, 0x70, 0x26, 0x2A]);

        let greet = metadata.method(Token(0x0600_0010)).unwrap();
        assert!(greet.is_abstract());
        assert!(greet.body.is_none());

        let cctor = metadata.constructor(Token(0x0600_0004)).unwrap();
        assert!(cctor.is_static);
        assert_eq!(cctor.name(), ".cctor");

        assert_eq!(
            metadata.user_string(Token(0x7000_0001)).unwrap(),
            "Hello & welcome"
        );
    }

    #[test]
    fn unknown_type_reference() {
        let doc = r#"<program><type token="0x02000001" name="T" base="Nope"/></program>"#;
        let err = load_program(doc).unwrap_err();
        assert!(err.to_string().contains("Unknown type 'Nope'"));
    }

    #[test]
    fn wrong_root() {
        assert!(load_program("<resolver/>").is_err());
    }

    #[test]
    fn hex_bodies() {
        assert_eq!(parse_hex("0a FF\n10").unwrap(), vec![0x0A, 0xFF, 0x10]);
        assert!(parse_hex("ABC").is_err());
        assert!(parse_hex("GG").is_err());
    }
}
