//! The tokenizer state machine.
//!
//! A single pass over the source bytes. Single- and double-character
//! operators are resolved by a one-byte lookahead; literals, comments,
//! identifiers, and numbers run through explicit states so that an
//! unterminated construct at end-of-file collapses into one `Invalid`
//! token covering the open span.

use koc_util::diagnostic::{codes, Color, Diagnostic, Label};
use koc_util::{Index, SourceFile};

use crate::token::{keyword_tag, TokenTag};
use crate::token_list::TokenList;

/// Tokenize a source file, reporting lex diagnostics into it.
pub fn tokenize(file: &mut SourceFile) -> TokenList {
    let content = std::mem::take(&mut file.content);
    let tokens = {
        let mut tokenizer = Tokenizer {
            file: &mut *file,
            tokens: TokenList::new(),
        };
        tokenizer.run(&content);
        tokenizer.tokens
    };
    file.content = content;
    tokens
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Ident,
    Str,
    StrEscape,
    MultiStr,
    MultiStrEscape,
    Char,
    CharEscape,
    Int,
    IntZero,
    IntPeriod,
    Float,
    CommentStart,
}

struct Tokenizer<'a> {
    file: &'a mut SourceFile,
    tokens: TokenList,
}

fn is_letter(byte: u8) -> bool {
    byte.is_ascii_lowercase() || byte.is_ascii_uppercase()
}

fn is_ident_byte(byte: u8) -> bool {
    is_letter(byte) || byte.is_ascii_digit() || byte == b'_'
}

fn radix_digit(byte: u8, radix: u32) -> bool {
    match radix {
        2 => matches!(byte, b'0' | b'1' | b'_'),
        8 => matches!(byte, b'0'..=b'7' | b'_'),
        16 => byte.is_ascii_hexdigit() || byte == b'_',
        _ => unreachable!(),
    }
}

impl Tokenizer<'_> {
    fn run(&mut self, content: &str) {
        let bytes = content.as_bytes();
        let size = bytes.len();

        let mut state = State::Normal;
        let mut start = 0usize;
        let mut tag = TokenTag::Invalid;
        let mut idx = 0usize;

        while idx < size {
            let ch = bytes[idx];
            let peek = bytes.get(idx + 1).copied();

            match state {
                State::Normal => {
                    start = idx;
                    match ch {
                        b' ' | b'\t' | b'\r' | b'\n' | 0 => {}
                        b'(' => self.push(TokenTag::ParenL, start, 1),
                        b')' => self.push(TokenTag::ParenR, start, 1),
                        b'[' => self.push(TokenTag::SquareL, start, 1),
                        b']' => self.push(TokenTag::SquareR, start, 1),
                        b'{' => self.push(TokenTag::CurlyL, start, 1),
                        b'}' => self.push(TokenTag::CurlyR, start, 1),
                        b'<' => self.push(TokenTag::Ls, start, 1),
                        b'>' => self.push(TokenTag::Gt, start, 1),
                        b';' => self.push(TokenTag::Semi, start, 1),
                        b'#' => self.push(TokenTag::Hashtag, start, 1),
                        b'.' => self.push(TokenTag::Dot, start, 1),
                        b'~' => self.push(TokenTag::Tilde, start, 1),
                        b',' => self.push(TokenTag::Comma, start, 1),
                        b'?' => idx += self.op2(start, peek, b'?', TokenTag::Question2, TokenTag::Question),
                        b':' => idx += self.op2(start, peek, b':', TokenTag::Colon2, TokenTag::Colon),
                        b'+' => idx += self.op2(start, peek, b'=', TokenTag::AddEq, TokenTag::Add),
                        b'*' => idx += self.op2(start, peek, b'=', TokenTag::StarEq, TokenTag::Star),
                        b'%' => idx += self.op2(start, peek, b'=', TokenTag::ModEq, TokenTag::Mod),
                        b'!' => idx += self.op2(start, peek, b'=', TokenTag::NotEq, TokenTag::Bang),
                        b'^' => idx += self.op2(start, peek, b'=', TokenTag::CaretEq, TokenTag::Caret),
                        b'=' => idx += self.op2(start, peek, b'=', TokenTag::EqEq, TokenTag::Eq),
                        b'-' => match peek {
                            Some(b'=') => {
                                self.push(TokenTag::MinusEq, start, 2);
                                idx += 1;
                            }
                            Some(b'>') => {
                                self.push(TokenTag::Arrow, start, 2);
                                idx += 1;
                            }
                            _ => self.push(TokenTag::Minus, start, 1),
                        },
                        b'&' => match peek {
                            Some(b'&') => {
                                self.push(TokenTag::AndAnd, start, 2);
                                idx += 1;
                            }
                            Some(b'=') => {
                                self.push(TokenTag::AndEq, start, 2);
                                idx += 1;
                            }
                            _ => self.push(TokenTag::And, start, 1),
                        },
                        b'|' => match peek {
                            Some(b'|') => {
                                self.push(TokenTag::OrOr, start, 2);
                                idx += 1;
                            }
                            Some(b'=') => {
                                self.push(TokenTag::OrEq, start, 2);
                                idx += 1;
                            }
                            _ => self.push(TokenTag::Or, start, 1),
                        },
                        b'/' => match peek {
                            Some(b'*') => {
                                idx += 1;
                                state = State::CommentStart;
                            }
                            Some(b'=') => {
                                self.push(TokenTag::DivEq, start, 2);
                                idx += 1;
                            }
                            Some(b'/') => {
                                // Line comment, no token
                                while idx < size && bytes[idx] != b'\n' {
                                    idx += 1;
                                }
                            }
                            _ => self.push(TokenTag::Div, start, 1),
                        },
                        b'"' => {
                            state = State::Str;
                            tag = TokenTag::StringLit;
                        }
                        b'`' => {
                            state = State::MultiStr;
                            tag = TokenTag::StringLit;
                        }
                        b'\'' => {
                            state = State::Char;
                            tag = TokenTag::CharLit;
                        }
                        b'0' => {
                            state = State::IntZero;
                            tag = TokenTag::NumberLit;
                        }
                        b'1'..=b'9' => {
                            state = State::Int;
                            tag = TokenTag::NumberLit;
                        }
                        _ if is_letter(ch) || ch == b'_' => state = State::Ident,
                        // Unknown byte, e.g. the start of an emoji
                        _ => self.push(TokenTag::Invalid, start, 1),
                    }
                }

                State::Ident => {
                    let mut end = idx;
                    while end < size && is_ident_byte(bytes[end]) {
                        end += 1;
                    }
                    self.push_ident(content, start, end);
                    state = State::Normal;
                    idx = end - 1;
                }

                State::Str => match ch {
                    b'"' => {
                        self.push(tag, start, idx + 1 - start);
                        state = State::Normal;
                    }
                    b'\\' => state = State::StrEscape,
                    // A raw line break invalidates a quoted string
                    b'\n' => tag = TokenTag::Invalid,
                    _ => {}
                },
                State::StrEscape => {
                    if ch == b'\n' {
                        tag = TokenTag::Invalid;
                    }
                    state = State::Str;
                }

                State::MultiStr => match ch {
                    b'`' => {
                        self.push(tag, start, idx + 1 - start);
                        state = State::Normal;
                    }
                    b'\\' => state = State::MultiStrEscape,
                    _ => {}
                },
                State::MultiStrEscape => state = State::MultiStr,

                State::Char => match ch {
                    b'\'' => {
                        self.push(tag, start, idx + 1 - start);
                        state = State::Normal;
                    }
                    b'\\' => state = State::CharEscape,
                    b'\n' => tag = TokenTag::Invalid,
                    _ => {}
                },
                State::CharEscape => {
                    if ch == b'\n' {
                        tag = TokenTag::Invalid;
                    }
                    state = State::Char;
                }

                State::Int => {
                    if ch == b'.' {
                        state = State::IntPeriod;
                    } else if ch != b'_' && !ch.is_ascii_digit() {
                        self.push(TokenTag::NumberLit, start, idx - start);
                        state = State::Normal;
                        idx -= 1;
                    }
                }
                State::IntZero => match ch {
                    b'x' | b'b' | b'o' => {
                        let radix = match ch {
                            b'x' => 16,
                            b'o' => 8,
                            _ => 2,
                        };
                        let mut end = idx + 1;
                        while end < size && radix_digit(bytes[end], radix) {
                            end += 1;
                        }
                        self.push(TokenTag::NumberLit, start, end - start);
                        state = State::Normal;
                        idx = end - 1;
                    }
                    _ => {
                        state = State::Int;
                        idx -= 1;
                    }
                },
                State::IntPeriod => {
                    if ch.is_ascii_digit() {
                        tag = TokenTag::FloatLit;
                        state = State::Float;
                    } else {
                        // The period does not start a fraction; the number
                        // ends before it and the period is re-lexed.
                        self.push(TokenTag::NumberLit, start, idx - 1 - start);
                        state = State::Normal;
                        idx -= 2;
                    }
                }
                State::Float => {
                    if ch != b'_' && !ch.is_ascii_digit() {
                        self.push(TokenTag::FloatLit, start, idx - start);
                        state = State::Normal;
                        idx -= 1;
                    }
                }

                State::CommentStart => {
                    if ch == b'*' && peek == Some(b'/') {
                        // `/**/`
                        self.file.add(
                            Diagnostic::warning(codes::EMPTY_BLOCK_COMMENT, "Empty multiline comment")
                                .with_label(
                                    Label::new("Remove this", start..idx + 2).with_color(Color::Red),
                                ),
                        );
                        idx += 1;
                        state = State::Normal;
                    } else if ch == b'*' {
                        // `/**` opens a doc comment; scan for the closer.
                        match Self::find_closer(bytes, idx + 1) {
                            Some(end) => {
                                self.push(TokenTag::DocComment, start, end + 2 - start);
                                idx = end + 1;
                                state = State::Normal;
                            }
                            None => {
                                self.push(TokenTag::Invalid, start, size - start);
                                idx = size;
                                state = State::Normal;
                                continue;
                            }
                        }
                    } else {
                        // Plain block comment, no token on success.
                        match Self::find_closer(bytes, idx) {
                            Some(end) => {
                                idx = end + 1;
                                state = State::Normal;
                            }
                            None => {
                                self.push(TokenTag::Invalid, start, size - start);
                                idx = size;
                                state = State::Normal;
                                continue;
                            }
                        }
                    }
                }
            }

            idx += 1;
        }

        // A construct still open at end-of-file becomes its pending token,
        // or a single Invalid token covering the open span.
        match state {
            State::Normal => {}
            State::Ident => self.push_ident(content, start, size),
            State::Int | State::IntZero => self.push(TokenTag::NumberLit, start, size - start),
            State::Float => self.push(TokenTag::FloatLit, start, size - start),
            State::Str
            | State::StrEscape
            | State::MultiStr
            | State::MultiStrEscape
            | State::Char
            | State::CharEscape
            | State::IntPeriod
            | State::CommentStart => self.push(TokenTag::Invalid, start, size - start),
        }

        self.push(TokenTag::EndOfFile, size, 0);
    }

    /// Position of the `*` of the next `*/` at or after `from`.
    fn find_closer(bytes: &[u8], from: usize) -> Option<usize> {
        let mut at = from;
        while at + 1 < bytes.len() {
            if bytes[at] == b'*' && bytes[at + 1] == b'/' {
                return Some(at);
            }
            at += 1;
        }
        None
    }

    fn push_ident(&mut self, content: &str, start: usize, end: usize) {
        let text = &content[start..end];
        let tag = if text == "_" {
            TokenTag::Underscore
        } else {
            keyword_tag(text).unwrap_or(TokenTag::Ident)
        };
        self.push(tag, start, end - start);
    }

    /// Emits a two-byte operator if the next byte matches, else the
    /// one-byte fallback. Returns how far past the current byte to skip.
    fn op2(&mut self, start: usize, peek: Option<u8>, second: u8, two: TokenTag, one: TokenTag) -> usize {
        if peek == Some(second) {
            self.push(two, start, 2);
            1
        } else {
            self.push(one, start, 1);
            0
        }
    }

    fn push(&mut self, tag: TokenTag, start: usize, len: usize) {
        self.tokens.push(tag, start as Index, len as Index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> (Vec<TokenTag>, SourceFile) {
        let mut file = SourceFile::new("test.k", src);
        let tokens = tokenize(&mut file);
        (tokens.tags[1..].to_vec(), file)
    }

    fn tags(src: &str) -> Vec<TokenTag> {
        lex(src).0
    }

    #[test]
    fn test_end_of_file() {
        assert_eq!(tags(""), vec![TokenTag::EndOfFile]);
    }

    #[test]
    fn test_doc_comment() {
        let src = "/**\n\n\n This is a doc comment\n*/struct";
        assert_eq!(
            tags(src),
            vec![TokenTag::DocComment, TokenTag::KStruct, TokenTag::EndOfFile]
        );
    }

    #[test]
    fn test_brackets() {
        use TokenTag::*;
        assert_eq!(
            tags("(((\n)))\n// (( )))"),
            vec![ParenL, ParenL, ParenL, ParenR, ParenR, ParenR, EndOfFile]
        );
        assert_eq!(
            tags("<<<\n>>>"),
            vec![Ls, Ls, Ls, Gt, Gt, Gt, EndOfFile]
        );
        assert_eq!(
            tags("[[[\n]]]"),
            vec![SquareL, SquareL, SquareL, SquareR, SquareR, SquareR, EndOfFile]
        );
        assert_eq!(
            tags("{{{\n}}}"),
            vec![CurlyL, CurlyL, CurlyL, CurlyR, CurlyR, CurlyR, EndOfFile]
        );
    }

    #[test]
    fn test_string_literals() {
        let src = "\"abcdef\"\n\"abcde\\\"\"\n`123456`\n`\nabcdef\n`";
        assert_eq!(
            tags(src),
            vec![
                TokenTag::StringLit,
                TokenTag::StringLit,
                TokenTag::StringLit,
                TokenTag::StringLit,
                TokenTag::EndOfFile
            ]
        );
    }

    #[test]
    fn test_string_with_line_break_is_invalid() {
        assert_eq!(tags("\"ab\ncd\""), vec![TokenTag::Invalid, TokenTag::EndOfFile]);
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(
            tags("'a'\n'\\\\'\n'\\n'"),
            vec![
                TokenTag::CharLit,
                TokenTag::CharLit,
                TokenTag::CharLit,
                TokenTag::EndOfFile
            ]
        );
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(
            tags("12345\n1_2__3__4___5\n0b001\n0xFF\n0o55"),
            vec![TokenTag::NumberLit; 5]
                .into_iter()
                .chain([TokenTag::EndOfFile])
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_float_literals() {
        use TokenTag::*;
        assert_eq!(
            tags("12345.0\n1.\n5._\n5.0_0__0\n5.555.555\n5.0"),
            vec![
                FloatLit, // 12345.0
                NumberLit, Dot, // 1.
                NumberLit, Dot, Underscore, // 5._
                FloatLit, // 5.0_0__0
                FloatLit, Dot, NumberLit, // 5.555.555
                FloatLit, // 5.0
                EndOfFile,
            ]
        );
    }

    #[test]
    fn test_symbols() {
        use TokenTag::*;
        let src = "_\n;\n#\n->\n.\n:\n::\n+\n+=\n-\n-=\n*\n*=\n%\n%=\n/\n/=\n?\n??\n!\n~\n&\n&&\n&=\n|\n||\n|=\n^\n^=\n=\n==\n!=\n";
        assert_eq!(
            tags(src),
            vec![
                Underscore, Semi, Hashtag, Arrow, Dot, Colon, Colon2, Add, AddEq, Minus, MinusEq,
                Star, StarEq, Mod, ModEq, Div, DivEq, Question, Question2, Bang, Tilde, And,
                AndAnd, AndEq, Or, OrOr, OrEq, Caret, CaretEq, Eq, EqEq, NotEq, EndOfFile,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        use TokenTag::*;
        assert_eq!(
            tags("import cast while for if else const pub mut dyn static in new break continue return struct trait enum variant var fn impl"),
            vec![
                KImport, KCast, KWhile, KFor, KIf, KElse, KConst, KPub, KMut, KDyn, KStatic,
                KIn, KNew, KBreak, KContinue, KReturn, KStruct, KTrait, KEnum, KVariant, KVar,
                KFn, KImpl, EndOfFile,
            ]
        );
    }

    #[test]
    fn test_empty_block_comment_warns() {
        let (tags, file) = lex("/**/;");
        assert_eq!(tags, vec![TokenTag::Semi, TokenTag::EndOfFile]);
        assert_eq!(file.warning_count(), 1);
    }

    #[test]
    fn test_unterminated_constructs_are_invalid() {
        assert_eq!(tags("\"abc"), vec![TokenTag::Invalid, TokenTag::EndOfFile]);
        assert_eq!(tags("'a"), vec![TokenTag::Invalid, TokenTag::EndOfFile]);
        assert_eq!(tags("/* abc"), vec![TokenTag::Invalid, TokenTag::EndOfFile]);
        assert_eq!(tags("/** abc"), vec![TokenTag::Invalid, TokenTag::EndOfFile]);
    }

    #[test]
    fn test_unknown_byte() {
        assert_eq!(tags("@"), vec![TokenTag::Invalid, TokenTag::EndOfFile]);
    }

    #[test]
    fn test_spans_cover_source() {
        // Without comments, the spans tile the source up to whitespace.
        let src = "const A : u32 = 4;\nfn f(a: i32) { a.b->c? += 0xFF_1; }\n\"str\" 'c' 3.25";
        let mut file = SourceFile::new("test.k", src);
        let tokens = tokenize(&mut file);

        let mut prev_end = 0usize;
        for (tag, loc) in tokens.tags.iter().zip(&tokens.locs).skip(1) {
            if *tag == TokenTag::EndOfFile {
                break;
            }
            let start = loc.start as usize;
            assert!(start >= prev_end, "overlapping span at {:?}", tag);
            let gap = &src[prev_end..start];
            assert!(gap.chars().all(char::is_whitespace), "gap {:?} before {:?}", gap, tag);
            prev_end = loc.end() as usize;
        }
        let tail = &src[prev_end..];
        assert!(tail.chars().all(char::is_whitespace));
        assert_eq!(*tokens.tags.last().unwrap(), TokenTag::EndOfFile);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Emitted spans are sorted, disjoint, and in bounds for any input
        /// drawn from the token alphabet.
        #[test]
        fn spans_sorted_disjoint(src in "[ \n\tA-Za-z0-9_+*/=<>;:,.&|^%!~?(){}\\[\\]\"'`-]{0,64}") {
            let mut file = SourceFile::new("prop.k", src.clone());
            let tokens = tokenize(&mut file);

            prop_assert_eq!(*tokens.tags.last().unwrap(), TokenTag::EndOfFile);

            let mut prev_end = 0usize;
            for (tag, loc) in tokens.tags.iter().zip(&tokens.locs).skip(1) {
                if *tag == TokenTag::EndOfFile {
                    continue;
                }
                let start = loc.start as usize;
                let end = loc.end() as usize;
                prop_assert!(start >= prev_end);
                prop_assert!(end >= start);
                prop_assert!(end <= src.len());
                prev_end = end;
            }
        }
    }
}
