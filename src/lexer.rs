use logos::Logos;

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::token::{Spanned, Token};

/// Tokenize a sprite script into a vector of spanned tokens.
pub fn lex(source: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => {
                tokens.push(Spanned { token, span });
            }
            Err(()) => {
                let fragment = &source[span.clone()];
                return Err(SyntaxError {
                    kind: SyntaxErrorKind::UnrecognizedToken(fragment.to_string()),
                    span: Some(span),
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_update_function() {
        let source = r#"
            // walk right forever
            function update() {
              move('right');
            }
        "#;

        let tokens = lex(source).expect("lexing should succeed");
        let kinds: Vec<_> = tokens.iter().map(|t| &t.token).collect();

        assert_eq!(kinds[0], &Token::Function);
        assert!(matches!(kinds[1], Token::Ident(s) if s == "update"));
        assert_eq!(kinds[2], &Token::LParen);
        assert_eq!(kinds[3], &Token::RParen);
        assert_eq!(kinds[4], &Token::LBrace);
        assert!(matches!(kinds[5], Token::Ident(s) if s == "move"));
        assert_eq!(kinds[6], &Token::LParen);
        assert!(matches!(kinds[7], Token::String(s) if s == "right"));
        assert_eq!(kinds[8], &Token::RParen);
        assert_eq!(kinds[9], &Token::Semicolon);
        assert_eq!(kinds[10], &Token::RBrace);
        assert_eq!(tokens.len(), 11);
    }

    #[test]
    fn lex_block_comments_are_skipped() {
        let tokens = lex("/* a\n * b */ let x").unwrap();
        assert_eq!(tokens[0].token, Token::Let);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn lex_longest_operator_wins() {
        let tokens = lex("a === b !== c => d += 1").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| &t.token).collect();
        assert_eq!(kinds[1], &Token::StrictEq);
        assert_eq!(kinds[3], &Token::StrictNotEq);
        assert_eq!(kinds[5], &Token::Arrow);
        assert_eq!(kinds[7], &Token::PlusAssign);
    }

    #[test]
    fn lex_string_escapes() {
        let tokens = lex(r#"'it\'s' "a\nb" 'A'"#).unwrap();
        assert!(matches!(&tokens[0].token, Token::String(s) if s == "it's"));
        assert!(matches!(&tokens[1].token, Token::String(s) if s == "a\nb"));
        assert!(matches!(&tokens[2].token, Token::String(s) if s == "A"));
    }

    #[test]
    fn lex_numbers() {
        let tokens = lex("3 0.25 .5 1e3").unwrap();
        let values: Vec<f64> = tokens
            .iter()
            .map(|t| match t.token {
                Token::Number(v) => v,
                _ => panic!("expected number"),
            })
            .collect();
        assert_eq!(values, vec![3.0, 0.25, 0.5, 1000.0]);
    }

    #[test]
    fn lex_keyword_prefix_is_identifier() {
        let tokens = lex("format iffy").unwrap();
        assert!(matches!(&tokens[0].token, Token::Ident(s) if s == "format"));
        assert!(matches!(&tokens[1].token, Token::Ident(s) if s == "iffy"));
    }

    #[test]
    fn lex_rejects_unknown_character() {
        let err = lex("let x = #").unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::UnrecognizedToken(ref t) if t == "#"));
        assert_eq!(err.span, Some(8..9));
    }
}
