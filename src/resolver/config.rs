//! Declarative resolver configuration.
//!
//! Two tables drive the [`crate::resolver::TypeResolver`]: type substitutions, which redirect
//! every use of a framework type to a replacement implementation, and native bindings, which
//! mark methods as implemented outside the program under an external symbol name. Both are
//! given by full type name so a configuration can be written before any metadata is loaded.
//!
//! ```xml
//! <resolver>
//!   <substitute target="System.Console" with="Kernel.Console"/>
//!   <native type="Kernel.Console" method="WriteLine" symbol="console_writeline">
//!     <param type="System.String"/>
//!   </native>
//! </resolver>
//! ```

use std::path::Path;

use crate::{utils::XmlNode, Result};

/// Redirects all uses of `target` to `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Full name of the type being replaced
    pub target: String,
    /// Full name of the type that replaces it
    pub replacement: String,
}

/// Binds a method to an externally provided symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBinding {
    /// Full name of the declaring type, after substitution
    pub type_name: String,
    /// Method name
    pub method: String,
    /// Parameter type names selecting one overload; `None` binds every overload
    pub params: Option<Vec<String>>,
    /// External symbol name
    pub symbol: String,
}

/// Substitution and native-linkage tables, supplied before discovery begins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Type substitutions
    pub substitutions: Vec<Substitution>,
    /// Native method bindings
    pub natives: Vec<NativeBinding>,
}

impl ResolverConfig {
    /// An empty configuration: nothing substituted, nothing native.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type substitution.
    #[must_use]
    pub fn substitute(mut self, target: &str, replacement: &str) -> Self {
        self.substitutions.push(Substitution {
            target: target.to_string(),
            replacement: replacement.to_string(),
        });
        self
    }

    /// Binds every overload of `type_name::method` to `symbol`.
    #[must_use]
    pub fn native(mut self, type_name: &str, method: &str, symbol: &str) -> Self {
        self.natives.push(NativeBinding {
            type_name: type_name.to_string(),
            method: method.to_string(),
            params: None,
            symbol: symbol.to_string(),
        });
        self
    }

    /// Binds the overload of `type_name::method` taking exactly `params` to `symbol`.
    #[must_use]
    pub fn native_overload(
        mut self,
        type_name: &str,
        method: &str,
        params: &[&str],
        symbol: &str,
    ) -> Self {
        self.natives.push(NativeBinding {
            type_name: type_name.to_string(),
            method: method.to_string(),
            params: Some(params.iter().map(|p| (*p).to_string()).collect()),
            symbol: symbol.to_string(),
        });
        self
    }

    /// Parses the XML configuration format.
    ///
    /// # Errors
    /// Returns [`crate::Error::Xml`] or [`crate::Error::Configuration`] for invalid documents.
    pub fn from_xml(source: &str) -> Result<Self> {
        let root = XmlNode::parse(source)?;
        if root.name != "resolver" {
            return Err(config_error!(
                "Expected <resolver> root element, found <{}>",
                root.name
            ));
        }

        let mut config = ResolverConfig::new();
        for node in &root.children {
            match node.name.as_str() {
                "substitute" => {
                    config = config.substitute(node.required("target")?, node.required("with")?);
                }
                "native" => {
                    let params: Vec<&str> = node
                        .children_named("param")
                        .map(|p| p.required("type"))
                        .collect::<Result<_>>()?;
                    let (ty, method, symbol) = (
                        node.required("type")?,
                        node.required("method")?,
                        node.required("symbol")?,
                    );
                    config = if params.is_empty() && !node.flag("noparams")? {
                        config.native(ty, method, symbol)
                    } else {
                        config.native_overload(ty, method, &params, symbol)
                    };
                }
                other => return Err(config_error!("Unexpected <{}> in resolver configuration", other)),
            }
        }

        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, otherwise as
    /// [`ResolverConfig::from_xml`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_xml(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_xml_agree() {
        let built = ResolverConfig::new()
            .substitute("System.Console", "Kernel.Console")
            .native_overload("Kernel.Console", "WriteLine", &["System.String"], "console_writeline")
            .native("Kernel.Memory", "Alloc", "kmalloc")
            .native_overload("Kernel.Cpu", "Halt", &[], "cpu_halt");

        let parsed = ResolverConfig::from_xml(
            r#"<resolver>
                 <substitute target="System.Console" with="Kernel.Console"/>
                 <native type="Kernel.Console" method="WriteLine" symbol="console_writeline">
                   <param type="System.String"/>
                 </native>
                 <native type="Kernel.Memory" method="Alloc" symbol="kmalloc"/>
                 <native type="Kernel.Cpu" method="Halt" symbol="cpu_halt" noparams="true"/>
               </resolver>"#,
        )
        .unwrap();

        assert_eq!(built, parsed);
    }

    #[test]
    fn rejects_unknown_elements() {
        let err = ResolverConfig::from_xml("<resolver><alias/></resolver>").unwrap_err();
        assert!(err.to_string().contains("Unexpected <alias>"));
    }

    #[test]
    fn rejects_missing_attributes() {
        assert!(ResolverConfig::from_xml(r#"<resolver><substitute target="A"/></resolver>"#).is_err());
    }
}
