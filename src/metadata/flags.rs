//! Attribute flag sets for types, methods and parameters.
//!
//! Values follow the ECMA-335 attribute encodings so that raw flag words taken from real
//! assemblies can be used unchanged. The program description also accepts the keyword
//! spelling (`"public virtual final"`), see [`method_flags_from_keywords`].

use bitflags::bitflags;

use crate::Result;

/// Bitmask covering the member access bits of a method flag word
pub const METHOD_ACCESS_MASK: u32 = 0x0007;
/// Bitmask covering the vtable layout bit of a method flag word
pub const METHOD_VTABLE_LAYOUT_MASK: u32 = 0x0100;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method access flags
    pub struct MethodAccessFlags: u32 {
        /// Member not referenceable
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
    }
}

impl MethodAccessFlags {
    /// Extract access flags from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & METHOD_ACCESS_MASK)
    }

    /// `true` when only the declaring type may see the method.
    ///
    /// Access is an enumeration, not a set, so this compares the whole value.
    #[must_use]
    pub fn is_private(self) -> bool {
        self == Self::PRIVATE
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method vtable layout flags
    pub struct MethodVtableFlags: u32 {
        /// Method reuses existing slot in vtable
        const REUSE_SLOT = 0x0000;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
    }
}

impl MethodVtableFlags {
    /// Extract vtable layout flags from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & METHOD_VTABLE_LAYOUT_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method modifiers and properties
    pub struct MethodModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// Runtime provides special behavior depending on the name
        const RTSPECIAL_NAME = 0x1000;
    }
}

impl MethodModifiers {
    /// Extract method modifiers from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !METHOD_ACCESS_MASK & !METHOD_VTABLE_LAYOUT_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Type attributes relevant to layout
    pub struct TypeFlags: u32 {
        /// Type is visible outside its assembly
        const PUBLIC = 0x0001;
        /// Type is an interface
        const INTERFACE = 0x0020;
        /// Type cannot be instantiated
        const ABSTRACT = 0x0080;
        /// Type cannot be derived from
        const SEALED = 0x0100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Parameter attributes
    pub struct ParamFlags: u32 {
        /// Parameter is an input
        const IN = 0x0001;
        /// Parameter is an output
        const OUT = 0x0002;
        /// Parameter is optional
        const OPTIONAL = 0x0010;
    }
}

/// Converts a whitespace separated keyword list into a raw method flag word.
///
/// Accepted keywords: `private`, `famandassem`, `assembly`, `family`, `famorassem`, `public`,
/// `static`, `final`, `virtual`, `hidebysig`, `newslot`, `abstract`, `specialname`,
/// `rtspecialname`. A hexadecimal word (`0x01C6`) is accepted as well.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] for an unknown keyword.
pub fn method_flags_from_keywords(text: &str) -> Result<u32> {
    if let Some(hex) = text.trim().strip_prefix("0x") {
        return u32::from_str_radix(hex, 16)
            .map_err(|_| config_error!("Invalid method flags '{}'", text));
    }

    let mut access = 0;
    let mut flags = 0;
    for word in text.split_whitespace() {
        match word {
            "private" => access = MethodAccessFlags::PRIVATE.bits(),
            "famandassem" => access = MethodAccessFlags::FAM_AND_ASSEM.bits(),
            "assembly" => access = MethodAccessFlags::ASSEM.bits(),
            "family" => access = MethodAccessFlags::FAMILY.bits(),
            "famorassem" => access = MethodAccessFlags::FAM_OR_ASSEM.bits(),
            "public" => access = MethodAccessFlags::PUBLIC.bits(),
            "static" => flags |= MethodModifiers::STATIC.bits(),
            "final" => flags |= MethodModifiers::FINAL.bits(),
            "virtual" => flags |= MethodModifiers::VIRTUAL.bits(),
            "hidebysig" => flags |= MethodModifiers::HIDE_BY_SIG.bits(),
            "newslot" => flags |= MethodVtableFlags::NEW_SLOT.bits(),
            "abstract" => flags |= MethodModifiers::ABSTRACT.bits(),
            "specialname" => flags |= MethodModifiers::SPECIAL_NAME.bits(),
            "rtspecialname" => flags |= MethodModifiers::RTSPECIAL_NAME.bits(),
            other => return Err(config_error!("Unknown method flag '{}'", other)),
        }
    }

    Ok(access | flags)
}

/// Converts a keyword list (`public`, `interface`, `abstract`, `sealed`) into [`TypeFlags`].
///
/// # Errors
/// Returns [`crate::Error::Configuration`] for an unknown keyword.
pub fn type_flags_from_keywords(text: &str) -> Result<TypeFlags> {
    let mut flags = TypeFlags::empty();
    for word in text.split_whitespace() {
        flags |= match word {
            "public" => TypeFlags::PUBLIC,
            "interface" => TypeFlags::INTERFACE | TypeFlags::ABSTRACT,
            "abstract" => TypeFlags::ABSTRACT,
            "sealed" => TypeFlags::SEALED,
            other => return Err(config_error!("Unknown type flag '{}'", other)),
        };
    }
    Ok(flags)
}

/// Converts a keyword list (`in`, `out`, `optional`) into [`ParamFlags`].
///
/// # Errors
/// Returns [`crate::Error::Configuration`] for an unknown keyword.
pub fn param_flags_from_keywords(text: &str) -> Result<ParamFlags> {
    let mut flags = ParamFlags::empty();
    for word in text.split_whitespace() {
        flags |= match word {
            "in" => ParamFlags::IN,
            "out" => ParamFlags::OUT,
            "optional" => ParamFlags::OPTIONAL,
            other => return Err(config_error!("Unknown parameter flag '{}'", other)),
        };
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_method_flags() {
        let raw = method_flags_from_keywords("public virtual newslot").unwrap();
        assert_eq!(raw, 0x0146);

        assert_eq!(
            MethodAccessFlags::from_method_flags(raw),
            MethodAccessFlags::PUBLIC
        );
        assert_eq!(
            MethodVtableFlags::from_method_flags(raw),
            MethodVtableFlags::NEW_SLOT
        );
        assert_eq!(
            MethodModifiers::from_method_flags(raw),
            MethodModifiers::VIRTUAL
        );
    }

    #[test]
    fn access_is_an_enumeration() {
        // FAMILY (4) | PRIVATE (1) would be FAM_OR_ASSEM (5), not private
        let access = MethodAccessFlags::from_method_flags(0x0005);
        assert!(!access.is_private());
        assert!(MethodAccessFlags::from_method_flags(0x0001).is_private());
    }

    #[test]
    fn hex_method_flags() {
        assert_eq!(method_flags_from_keywords("0x0016").unwrap(), 0x0016);
        assert!(method_flags_from_keywords("public sometimes").is_err());
    }

    #[test]
    fn type_and_param_keywords() {
        let ty = type_flags_from_keywords("public interface").unwrap();
        assert!(ty.contains(TypeFlags::INTERFACE | TypeFlags::ABSTRACT));

        let param = param_flags_from_keywords("in optional").unwrap();
        assert_eq!(param, ParamFlags::IN | ParamFlags::OPTIONAL);
        assert!(param_flags_from_keywords("ref").is_err());
    }
}
