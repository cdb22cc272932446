use mjs_ast::Version;

/// A reserved word, classified separately from ordinary identifiers by the
/// version-gated tables below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    False,
    Finally,
    For,
    Function,
    If,
    In,
    InstanceOf,
    New,
    Null,
    Return,
    Switch,
    This,
    Throw,
    True,
    Try,
    TypeOf,
    Var,
    Void,
    While,
    With,

    // Strict-mode future-reserved words (ES5 §7.6.1.2); valid identifiers
    // at the ES1/ES3 tiers, reserved only when the lexer is asked for the
    // ES5 strict set.
    Implements,
    Interface,
    Let,
    Package,
    Private,
    Protected,
    Public,
    Static,
    Yield,
}

/// ES1 baseline keyword table (ECMA-262 1st edition §7.5.2).
static ES1_KEYWORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
    "break" => Keyword::Break,
    "continue" => Keyword::Continue,
    "delete" => Keyword::Delete,
    "else" => Keyword::Else,
    "false" => Keyword::False,
    "for" => Keyword::For,
    "function" => Keyword::Function,
    "if" => Keyword::If,
    "in" => Keyword::In,
    "new" => Keyword::New,
    "null" => Keyword::Null,
    "return" => Keyword::Return,
    "this" => Keyword::This,
    "true" => Keyword::True,
    "typeof" => Keyword::TypeOf,
    "var" => Keyword::Var,
    "void" => Keyword::Void,
    "while" => Keyword::While,
    "with" => Keyword::With,
};

/// Words ES3 adds over the ES1 set.
static ES3_ADDITIONAL_KEYWORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
    "case" => Keyword::Case,
    "catch" => Keyword::Catch,
    "default" => Keyword::Default,
    "do" => Keyword::Do,
    "finally" => Keyword::Finally,
    "instanceof" => Keyword::InstanceOf,
    "switch" => Keyword::Switch,
    "throw" => Keyword::Throw,
    "try" => Keyword::Try,
};

/// Words ES5 adds over the ES3 set.
static ES5_ADDITIONAL_KEYWORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
    "debugger" => Keyword::Debugger,
};

/// Strict-mode-only future-reserved words (ES5 §7.6.1.2). These are always
/// valid identifiers outside strict mode, at every version.
static STRICT_RESERVED_WORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
    "implements" => Keyword::Implements,
    "interface" => Keyword::Interface,
    "let" => Keyword::Let,
    "package" => Keyword::Package,
    "private" => Keyword::Private,
    "protected" => Keyword::Protected,
    "public" => Keyword::Public,
    "static" => Keyword::Static,
    "yield" => Keyword::Yield,
};

/// Looks up `word` as a keyword at `version`. Strict-reserved words are
/// never returned here regardless of version — callers that care about
/// strict mode consult [`is_strict_reserved_word`] separately, since their
/// reservedness depends on the parser's current strict-mode flag rather
/// than the source's language version alone.
pub fn lookup(word: &str, version: Version) -> Option<Keyword> {
    if let Some(k) = ES1_KEYWORDS.get(word) {
        return Some(*k);
    }
    if version.at_least(Version::Es3) {
        if let Some(k) = ES3_ADDITIONAL_KEYWORDS.get(word) {
            return Some(*k);
        }
    }
    if version.at_least(Version::Es5) {
        if let Some(k) = ES5_ADDITIONAL_KEYWORDS.get(word) {
            return Some(*k);
        }
    }
    None
}

pub fn is_strict_reserved_word(word: &str) -> bool {
    STRICT_RESERVED_WORDS.contains_key(word)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_gating() {
        assert_eq!(lookup("switch", Version::Es1), None);
        assert_eq!(lookup("switch", Version::Es3), Some(Keyword::Switch));
        assert_eq!(lookup("debugger", Version::Es3), None);
        assert_eq!(lookup("debugger", Version::Es5), Some(Keyword::Debugger));
    }

    #[test]
    fn strict_reserved_words_are_not_ordinary_keywords() {
        assert_eq!(lookup("let", Version::Es5), None);
        assert!(is_strict_reserved_word("let"));
    }
}
