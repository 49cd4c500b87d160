//! C spelling of representation types.
//!
//! Each representation has a C type and a suffix naming its runtime
//! operations: `init_<sfx>`, `clear_<sfx>`, `set_<sfx>`, and the
//! conversions `init_<to>_of_<from>` and `convert_<to>_of_<from>`.

use super::mangle::mangle;
use crate::types::CTyp;

/// Operation suffix of a representation.
pub fn suffix(ctyp: &CTyp) -> String {
    match ctyp {
        CTyp::Int => "big_int".to_string(),
        CTyp::LBits(_) => "lbits".to_string(),
        CTyp::FBits(..) => "fbits".to_string(),
        CTyp::I64 => "mach_int".to_string(),
        CTyp::Unit => "unit".to_string(),
        CTyp::Bool => "bool".to_string(),
        CTyp::String => "string".to_string(),
        CTyp::Tuple(elems) => {
            let parts: Vec<String> = elems.iter().map(suffix).collect();
            format!("tuple_{}", parts.join("_"))
        }
        CTyp::Struct(name, _) | CTyp::Enum(name, _) | CTyp::Variant(name, _) => mangle(name),
        CTyp::Ref(inner) => format!("ref_{}", suffix(inner)),
    }
}

/// C type of a representation.
pub fn c_type(ctyp: &CTyp) -> String {
    match ctyp {
        CTyp::Tuple(_) | CTyp::Struct(..) | CTyp::Variant(..) => format!("struct {}", suffix(ctyp)),
        CTyp::Enum(..) => format!("enum {}", suffix(ctyp)),
        CTyp::Ref(inner) => format!("{} *", c_type(inner)),
        _ => suffix(ctyp),
    }
}

/// Name of the enum tagging a union's active constructor.
pub fn kind_enum(union: &str) -> String {
    format!("kind_{}", mangle(union))
}

/// Tag value of one constructor.
pub fn kind_tag(ctor: &str) -> String {
    format!("Kind_{}", mangle(ctor))
}
