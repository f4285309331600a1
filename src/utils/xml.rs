//! Minimal owned element tree over `quick-xml` events.
//!
//! Both the program description and the resolver configuration are small documents that are
//! easier to validate as a tree than as an event stream, so they are read into [`XmlNode`]s
//! first.

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::Result;

/// One XML element with its attributes, child elements and concatenated text content.
#[derive(Debug, Default, Clone)]
pub(crate) struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    /// Parses `source` and returns its root element.
    ///
    /// # Errors
    /// Returns [`crate::Error::Xml`] for syntax errors and [`crate::Error::Configuration`]
    /// for bad attributes, escapes, or a document without a root element.
    pub fn parse(source: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(source);
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    stack.push(Self::element(e)?);
                }
                Event::Empty(ref e) => {
                    let node = Self::element(e)?;
                    Self::attach(&mut stack, &mut root, node);
                }
                Event::Text(ref e) => {
                    let text = e.unescape().map_err(|err| config_error!("{}", err))?;
                    let text = text.trim();
                    if let (Some(parent), false) = (stack.last_mut(), text.is_empty()) {
                        parent.text.push_str(text);
                    }
                }
                Event::CData(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::End(_) => {
                    if let Some(node) = stack.pop() {
                        Self::attach(&mut stack, &mut root, node);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or_else(|| config_error!("XML document has no root element"))
    }

    /// Element name and unescaped attributes of a start or empty tag.
    fn element(e: &BytesStart) -> Result<XmlNode> {
        let mut node = XmlNode {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            ..XmlNode::default()
        };
        for attr in e.attributes() {
            let attr = attr.map_err(|err| config_error!("{}", err))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| config_error!("{}", err))?
                .into_owned();
            node.attributes.push((key, value));
        }
        Ok(node)
    }

    fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => {
                if root.is_none() {
                    *root = Some(node);
                }
            }
        }
    }

    /// Returns the value of attribute `key`, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of attribute `key`, or a configuration error naming the element.
    pub fn required(&self, key: &str) -> Result<&str> {
        self.attr(key)
            .ok_or_else(|| config_error!("<{}> is missing attribute '{}'", self.name, key))
    }

    /// Parses a boolean attribute, defaulting to `false` when absent.
    pub fn flag(&self, key: &str) -> Result<bool> {
        match self.attr(key) {
            None => Ok(false),
            Some("true" | "1") => Ok(true),
            Some("false" | "0") => Ok(false),
            Some(other) => Err(config_error!(
                "<{}> attribute '{}' is not a boolean: '{}'",
                self.name,
                key,
                other
            )),
        }
    }

    /// Iterates the child elements called `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tree() {
        let doc = r#"<?xml version="1.0"?>
            <root a="1">
                <child b="x &amp; y"/>
                <child b="z">text</child>
                <!-- ignored -->
                <other/>
            </root>"#;
        let root = XmlNode::parse(doc).unwrap();

        assert_eq!(root.name, "root");
        assert_eq!(root.attr("a"), Some("1"));
        assert_eq!(root.children.len(), 3);

        let kids: Vec<_> = root.children_named("child").collect();
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].attr("b"), Some("x & y"));
        assert_eq!(kids[1].text, "text");
    }

    #[test]
    fn missing_attribute() {
        let root = XmlNode::parse("<type/>").unwrap();
        let err = root.required("name").unwrap_err();
        assert!(err.to_string().contains("missing attribute 'name'"));
    }

    #[test]
    fn boolean_flags() {
        let root = XmlNode::parse(r#"<f a="true" b="0" c="maybe"/>"#).unwrap();
        assert!(root.flag("a").unwrap());
        assert!(!root.flag("b").unwrap());
        assert!(!root.flag("missing").unwrap());
        assert!(root.flag("c").is_err());
    }

    #[test]
    fn empty_document() {
        assert!(XmlNode::parse("").is_err());
    }

    #[test]
    fn start_and_empty_tags_read_attributes_alike() {
        let root = XmlNode::parse(r#"<r k="a &lt; b"><e k="c &gt; d"/></r>"#).unwrap();
        assert_eq!(root.attr("k"), Some("a < b"));
        assert_eq!(root.children[0].attr("k"), Some("c > d"));
        assert!(XmlNode::parse(r#"<r k="1" k="2"/>"#).is_err());
    }
}
