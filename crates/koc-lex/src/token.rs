//! Token tags and source locations.

use koc_util::Index;
use static_assertions::assert_eq_size;

/// The kind of a token.
///
/// Keywords carry a `K` prefix. The discriminant fits in one byte so the
/// tag vector stays dense.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenTag {
    // Meta
    Invalid,
    StartOfFile,
    EndOfFile,
    /// `/** ... */`
    DocComment,

    // Brackets
    ParenL,
    ParenR,
    Ls,
    Gt,
    SquareL,
    SquareR,
    CurlyL,
    CurlyR,

    StringLit,
    CharLit,
    NumberLit,
    FloatLit,

    Ident,

    /// `_` alone
    Underscore,
    Semi,
    Hashtag,
    /// `->`
    Arrow,
    Dot,
    Colon,
    /// `::`
    Colon2,
    Comma,

    // Operators
    Add,
    AddEq,
    Minus,
    MinusEq,
    Star,
    StarEq,
    Mod,
    ModEq,
    Div,
    DivEq,
    Question,
    /// `??`
    Question2,

    Bang,
    Tilde,

    And,
    AndAnd,
    AndEq,
    Or,
    OrOr,
    OrEq,
    Caret,
    CaretEq,

    Eq,
    EqEq,
    NotEq,

    // Keywords
    KImport,
    KCast,
    KWhile,
    KFor,
    KIf,
    KElse,
    KConst,
    KPub,
    KMut,
    KDyn,
    KStatic,
    KIn,
    KNew,
    KBreak,
    KContinue,
    KReturn,
    KStruct,
    KTrait,
    KEnum,
    KVariant,
    KVar,
    KFn,
    KImpl,
}

assert_eq_size!(TokenTag, u8);

/// Byte span of a token inside its file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenLoc {
    pub start: Index,
    pub len: Index,
}

impl TokenLoc {
    pub const fn new(start: Index, len: Index) -> Self {
        Self { start, len }
    }

    pub const fn end(&self) -> Index {
        self.start + self.len
    }
}

/// Looks up the keyword tag for an identifier, if it is one.
pub fn keyword_tag(ident: &str) -> Option<TokenTag> {
    let tag = match ident {
        "import" => TokenTag::KImport,
        "cast" => TokenTag::KCast,
        "while" => TokenTag::KWhile,
        "for" => TokenTag::KFor,
        "if" => TokenTag::KIf,
        "else" => TokenTag::KElse,
        "const" => TokenTag::KConst,
        "pub" => TokenTag::KPub,
        "mut" => TokenTag::KMut,
        "dyn" => TokenTag::KDyn,
        "static" => TokenTag::KStatic,
        "in" => TokenTag::KIn,
        "new" => TokenTag::KNew,
        "break" => TokenTag::KBreak,
        "continue" => TokenTag::KContinue,
        "return" => TokenTag::KReturn,
        "struct" => TokenTag::KStruct,
        "trait" => TokenTag::KTrait,
        "enum" => TokenTag::KEnum,
        "variant" => TokenTag::KVariant,
        "var" => TokenTag::KVar,
        "fn" => TokenTag::KFn,
        "impl" => TokenTag::KImpl,
        _ => return None,
    };
    Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(keyword_tag("import"), Some(TokenTag::KImport));
        assert_eq!(keyword_tag("fn"), Some(TokenTag::KFn));
        assert_eq!(keyword_tag("impl"), Some(TokenTag::KImpl));
        assert_eq!(keyword_tag("function"), None);
        assert_eq!(keyword_tag(""), None);
    }

    #[test]
    fn test_loc_end() {
        let loc = TokenLoc::new(4, 3);
        assert_eq!(loc.end(), 7);
    }
}
