//! Stylesheet text parsing built on `cssparser`.
//! Spec: <https://www.w3.org/TR/css-syntax-3/>
//!
//! Produces the tagged rule tree of [`crate::CssRule`]: qualified rules
//! become [`crate::StyleRule`], `@media` blocks become
//! [`crate::ConditionalGroupRule`] with their inner rules parsed
//! recursively, and every other at-rule is kept as [`crate::OtherRule`].
//! Malformed rules are skipped, never fatal.

use crate::ConditionalGroupRule;
use crate::CssRule;
use crate::Declaration;
use crate::OtherRule;
use crate::StyleRule;
use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::BasicParseErrorKind;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::StyleSheetParser;

/// Parse stylesheet text into a rule tree. Rule ids are assigned later,
/// when the rules enter a [`crate::Document`].
pub fn parse_stylesheet_text(css: &str) -> Vec<CssRule> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut tree = RuleTreeParser;
    let mut rules = Vec::new();
    for rule in StyleSheetParser::new(&mut parser, &mut tree).flatten() {
        rules.push(rule);
    }
    rules
}

/// Split `!important` off the end of a value, returning the bare value and
/// the importance flag.
fn split_important_tail(value: &str) -> (String, bool) {
    let trimmed = value.trim();
    if let Some(position) = trimmed.rfind("!important")
        && let Some(prefix) = trimmed.get(..position)
    {
        return (prefix.trim_end().to_owned(), true);
    }
    (trimmed.to_owned(), false)
}

/// Collects the declarations of one rule body.
struct DeclarationCollector;

impl CssDeclarationParser<'_> for DeclarationCollector {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        let start = input.position();
        // Consume to the end of the declaration item.
        while input.next_including_whitespace_and_comments().is_ok() {}
        let raw = input.slice_from(start);
        let (value, important) = split_important_tail(raw);
        Ok(Declaration {
            name: name.to_ascii_lowercase(),
            value,
            important,
        })
    }
}

impl CssAtRuleParser<'_> for DeclarationCollector {
    type Prelude = ();
    type AtRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        _name: CowRcStr<'input>,
        _input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl CssQualifiedRuleParser<'_> for DeclarationCollector {
    type Prelude = ();
    type QualifiedRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl CssRuleBodyItemParser<'_, Declaration, ()> for DeclarationCollector {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Raw prelude of an at-rule: its lowercased name plus unparsed tail.
struct AtRulePrelude {
    name: String,
    prelude: String,
}

/// Builds the rule tree, recursing into `@media` blocks.
struct RuleTreeParser;

impl CssAtRuleParser<'_> for RuleTreeParser {
    type Prelude = AtRulePrelude;
    type AtRule = CssRule;
    type Error = ();

    fn parse_prelude<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let start = input.state();
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(AtRulePrelude {
            name: name.to_ascii_lowercase(),
            prelude: input.slice_from(start.position()).trim().to_owned(),
        })
    }

    fn parse_block<'input>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        if prelude.name == "media" {
            let mut nested = RuleTreeParser;
            let mut rules = Vec::new();
            for rule in StyleSheetParser::new(input, &mut nested).flatten() {
                rules.push(rule);
            }
            return Ok(CssRule::ConditionalGroup(ConditionalGroupRule {
                id: 0,
                condition: prelude.prelude,
                rules,
                engine_injected: false,
            }));
        }

        // Block contents of other at-rules are not retained.
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(CssRule::Other(OtherRule {
            id: 0,
            text: at_rule_text(&prelude),
        }))
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Ok(CssRule::Other(OtherRule {
            id: 0,
            text: at_rule_text(&prelude),
        }))
    }
}

impl CssQualifiedRuleParser<'_> for RuleTreeParser {
    type Prelude = String; // raw selector text
    type QualifiedRule = CssRule;
    type Error = ();

    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let start = input.state();
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(input.slice_from(start.position()).trim().to_owned())
    }

    fn parse_block<'input>(
        &mut self,
        selector: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        let mut collector = DeclarationCollector;
        let mut declarations = Vec::new();
        for declaration in CssRuleBodyParser::new(input, &mut collector).flatten() {
            declarations.push(declaration);
        }
        Ok(CssRule::Style(StyleRule {
            id: 0,
            selector,
            declarations,
        }))
    }
}

fn at_rule_text(prelude: &AtRulePrelude) -> String {
    if prelude.prelude.is_empty() {
        format!("@{}", prelude.name)
    } else {
        format!("@{} {}", prelude.name, prelude.prelude)
    }
}
