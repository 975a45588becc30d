//! Parser for cron expressions.
//!
//! `cronex` uses [`CronParser`] to parse expressions. Invoking
//!
//! ```rust
//! # use std::str::FromStr as _;
//! #
//! # use cronex::Cron;
//! #
//! Cron::from_str("0 12 * * MON-FRI");
//! ```
//!
//! is equivalent to
//!
//! ```rust
//! # use cronex::parser::CronParser;
//! #
//! CronParser::new().parse("0 12 * * MON-FRI");
//! ```
//!
//! You can customise the parser by creating a parser builder using
//! [`CronParser::builder`]. So, for example, to parse expressions with a
//! leading seconds field do something like this:
//!
//! ```rust
//! use cronex::parser::CronParser;
//!
//! let parser = CronParser::builder().seconds(true).build();
//!
//! let every_ten_seconds = parser.parse("*/10 * * * * *").unwrap();
//! assert!(every_ten_seconds.has_seconds());
//! ```

use std::str::FromStr;

use derive_builder::Builder;
use strum::EnumString;
use tracing::trace;

use crate::{
    component::{CronComponent, FieldKind},
    errors::CronError,
    keywords::{KeywordTable, MONTHS, WEEKDAYS},
    lexer::{Lexer, Token, TokenKind},
    pattern::CronPattern,
    Cron, RebootOnce, YEAR_LOWER_LIMIT, YEAR_UPPER_LIMIT,
};

/// Parser for cron expressions.
///
/// In order to build a custom cron parser use [`CronParser::builder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Builder)]
#[builder(default, build_fn(skip), pattern = "owned")]
pub struct CronParser {
    /// Expect a leading seconds field.
    seconds: bool,
    /// Number weekdays from 1 (Sunday) to 7 (Saturday) instead of 0 to 6.
    one_based_day_of_week: bool,
    /// Allow day-of-month and day-of-week to both be given without a `?`.
    allow_both_day_fields: bool,
}

impl Default for CronParser {
    fn default() -> Self {
        Self {
            seconds: false,
            one_based_day_of_week: false,
            allow_both_day_fields: true,
        }
    }
}

/// Named shorthands, written `@name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Alias {
    Yearly,
    Annually,
    Monthly,
    Weekly,
    Daily,
    Midnight,
    Hourly,
    Reboot,
}

impl Alias {
    /// The five-field expression the alias stands for; `None` for `@reboot`.
    fn expansion(self) -> Option<&'static str> {
        match self {
            Alias::Yearly | Alias::Annually => Some("0 0 1 1 *"),
            Alias::Monthly => Some("0 0 1 * *"),
            Alias::Weekly => Some("0 0 * * 0"),
            Alias::Daily | Alias::Midnight => Some("0 0 * * *"),
            Alias::Hourly => Some("0 * * * *"),
            Alias::Reboot => None,
        }
    }
}

impl CronParser {
    /// Create a new parser.
    ///
    /// You should probably be using [`Cron`]'s implementation of
    /// [`FromStr`] instead of invoking this.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a builder for custom parsing.
    ///
    /// Equivalent to [`CronParserBuilder::default`].
    pub fn builder() -> CronParserBuilder {
        CronParserBuilder::default()
    }

    /// Parses a cron expression or an `@alias`.
    pub fn parse(&self, pattern: &str) -> Result<Cron, CronError> {
        let source = pattern.trim();
        if source.is_empty() {
            return Err(CronError::EmptyPattern);
        }

        if let Some(name) = source.strip_prefix('@') {
            let position = pattern.len() - pattern.trim_start().len() + 1;
            return Self::resolve_alias(name, position);
        }

        self.parse_pattern(pattern, source).map(Cron::Pattern)
    }

    /// True if `pattern` parses with this configuration.
    pub fn is_valid(&self, pattern: &str) -> bool {
        self.parse(pattern).is_ok()
    }

    // Aliases ignore the caller's configuration.
    fn resolve_alias(name: &str, position: usize) -> Result<Cron, CronError> {
        let alias = Alias::from_str(name).map_err(|_| CronError::UnknownKeyword {
            keyword: name.to_string(),
            position,
        })?;
        trace!(alias = name, expansion = ?alias.expansion(), "resolving cron alias");

        match alias.expansion() {
            Some(expansion) => CronParser::new()
                .parse_pattern(expansion, expansion)
                .map(Cron::Pattern),
            None => Ok(Cron::Reboot(RebootOnce::new())),
        }
    }

    fn parse_pattern(&self, input: &str, source: &str) -> Result<CronPattern, CronError> {
        let mut fields = FieldParser::new(input);

        let seconds = if self.seconds {
            fields.generic(0, 59)?
        } else {
            CronComponent::full(0, 59)
        };
        let minutes = fields.generic(0, 59)?;
        let hours = fields.generic(0, 23)?;
        let days = fields.day_of_month()?;
        let months = fields.month()?;
        let days_of_week = fields.day_of_week(self.one_based_day_of_week)?;
        let years = if fields.has_more_fields() {
            fields.generic(YEAR_LOWER_LIMIT, YEAR_UPPER_LIMIT)?
        } else {
            CronComponent::full(YEAR_LOWER_LIMIT, YEAR_UPPER_LIMIT)
        };
        fields.finish()?;

        if !self.allow_both_day_fields && !days.is_unspecified() && !days_of_week.is_unspecified()
        {
            return Err(CronError::ConflictingDayFields);
        }

        Ok(CronPattern {
            source: source.to_ascii_uppercase(),
            seconds,
            minutes,
            hours,
            days,
            months,
            days_of_week,
            years,
            with_seconds: self.seconds,
            one_based_day_of_week: self.one_based_day_of_week,
            allow_both_day_fields: self.allow_both_day_fields,
        })
    }
}

impl CronParserBuilder {
    pub fn build(self) -> CronParser {
        let defaults = CronParser::default();
        let CronParserBuilder {
            seconds,
            one_based_day_of_week,
            allow_both_day_fields,
        } = self;
        CronParser {
            seconds: seconds.unwrap_or(defaults.seconds),
            one_based_day_of_week: one_based_day_of_week
                .unwrap_or(defaults.one_based_day_of_week),
            allow_both_day_fields: allow_both_day_fields
                .unwrap_or(defaults.allow_both_day_fields),
        }
    }
}

type ItemParser = fn(&mut FieldParser, &mut CronComponent) -> Result<(), CronError>;

// Walks the token stream one field at a time. `current` always holds the next
// unconsumed token; a field ends on a field separator or the end of input.
struct FieldParser {
    lexer: Lexer,
    current: Token,
    peeked: Option<Token>,
}

impl FieldParser {
    fn new(input: &str) -> Self {
        Self {
            lexer: Lexer::new(input),
            current: Token::new(TokenKind::FieldSeparator, 0),
            peeked: None,
        }
    }

    fn generic(&mut self, min: u32, max: u32) -> Result<CronComponent, CronError> {
        let component = CronComponent::new(min, max, FieldKind::Generic);
        self.field(component, 0, None, Self::parse_numeric_item)
    }

    fn day_of_month(&mut self) -> Result<CronComponent, CronError> {
        let component = CronComponent::new(1, 31, FieldKind::day_of_month());
        self.field(component, 0, None, Self::parse_day_of_month_item)
    }

    fn month(&mut self) -> Result<CronComponent, CronError> {
        let component = CronComponent::new(1, 12, FieldKind::Month);
        self.field(component, 0, Some(&MONTHS), Self::parse_numeric_item)
    }

    fn day_of_week(&mut self, one_based: bool) -> Result<CronComponent, CronError> {
        let component = CronComponent::new(0, 6, FieldKind::day_of_week(!one_based));
        self.field(
            component,
            i64::from(one_based),
            Some(&WEEKDAYS),
            Self::parse_day_of_week_item,
        )
    }

    fn field(
        &mut self,
        mut component: CronComponent,
        offset: i64,
        keywords: Option<&'static KeywordTable>,
        item: ItemParser,
    ) -> Result<CronComponent, CronError> {
        if self.current.kind.is_field_separator() {
            self.lexer.configure(offset, keywords);
            self.advance()?;
        }

        // An empty field matches nothing.
        if self.at_field_end() {
            return Ok(component);
        }

        loop {
            item(self, &mut component)?;
            match self.current.kind {
                TokenKind::ListSeparator => self.advance()?,
                TokenKind::FieldSeparator | TokenKind::EndOfInput => return Ok(component),
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn has_more_fields(&self) -> bool {
        self.current.kind.is_field_separator() && self.lexer.has_next()
    }

    fn finish(&mut self) -> Result<(), CronError> {
        if self.has_more_fields() {
            let token = self.lexer.next_token()?;
            return Err(CronError::TrailingInput {
                position: token.position,
            });
        }
        Ok(())
    }

    // N | N-M | N/S | N-M/S | * | */S
    fn parse_numeric_item(&mut self, component: &mut CronComponent) -> Result<(), CronError> {
        let (first, last) = match self.current.kind {
            TokenKind::Wildcard => {
                self.advance()?;
                (i64::from(component.min()), i64::from(component.max()))
            }
            TokenKind::Number => {
                let first = self.current.value;
                self.advance()?;
                match self.current.kind {
                    TokenKind::Range => {
                        self.advance()?;
                        let last = self.expect_number("expected a number after '-'")?.value;
                        component.normalize_range(first, last)
                    }
                    TokenKind::Step => (first, i64::from(component.max())),
                    _ => {
                        component.insert(first);
                        return Ok(());
                    }
                }
            }
            _ => return Err(self.unexpected()),
        };

        if self.current.kind.is_step() {
            self.advance()?;
            let step = self.expect_number("expected a number after '/'")?;
            if step.raw == 0 {
                return Err(CronError::Grammar {
                    message: "step must be greater than zero",
                    position: step.position,
                });
            }
            component.insert_stepped(first, last, step.raw);
        } else if first == i64::from(component.min()) && last == i64::from(component.max()) {
            component.set_full_range();
        } else {
            component.insert_range(first, last);
        }
        Ok(())
    }

    // L | NW | ? | numeric item
    fn parse_day_of_month_item(&mut self, component: &mut CronComponent) -> Result<(), CronError> {
        let kind = self.current.kind;
        match kind {
            TokenKind::Last => {
                component.set_last_day();
                self.advance()
            }
            TokenKind::Unspecified => {
                component.set_unspecified();
                self.advance()
            }
            TokenKind::Number if self.peek()?.kind.is_weekday() => {
                component.set_nearest_weekday(self.current.value);
                self.advance()?;
                self.advance()
            }
            _ => self.parse_numeric_item(component),
        }
    }

    // NL | N#k | ? | numeric item
    fn parse_day_of_week_item(&mut self, component: &mut CronComponent) -> Result<(), CronError> {
        let kind = self.current.kind;
        match kind {
            TokenKind::Unspecified => {
                component.set_unspecified();
                self.advance()
            }
            TokenKind::Number => {
                let weekday = self.current.value;
                match self.peek()?.kind {
                    TokenKind::Last => {
                        component.add_last_weekday(weekday);
                        self.advance()?;
                        self.advance()
                    }
                    TokenKind::Nth => {
                        self.advance()?;
                        self.advance()?;
                        let ordinal = self.expect_number("expected a number after '#'")?;
                        if !(1..=5).contains(&ordinal.raw) {
                            return Err(CronError::Grammar {
                                message: "occurrence must be between 1 and 5",
                                position: ordinal.position,
                            });
                        }
                        component.add_nth_weekday(weekday, ordinal.raw);
                        Ok(())
                    }
                    _ => self.parse_numeric_item(component),
                }
            }
            _ => self.parse_numeric_item(component),
        }
    }

    fn advance(&mut self) -> Result<(), CronError> {
        self.current = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(())
    }

    // Only called while inside a field, so the peeked token is lexed with the
    // configuration of the field it belongs to.
    fn peek(&mut self) -> Result<Token, CronError> {
        match self.peeked {
            Some(token) => Ok(token),
            None => {
                let token = self.lexer.next_token()?;
                self.peeked = Some(token);
                Ok(token)
            }
        }
    }

    fn expect_number(&mut self, message: &'static str) -> Result<Token, CronError> {
        let token = self.current;
        if !token.kind.is_number() {
            return Err(CronError::Grammar {
                message,
                position: token.position,
            });
        }
        self.advance()?;
        Ok(token)
    }

    fn at_field_end(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::FieldSeparator | TokenKind::EndOfInput
        )
    }

    fn unexpected(&self) -> CronError {
        CronError::UnexpectedToken {
            token: self.current.kind,
            position: self.current.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash as _, Hasher as _};
    use std::str::FromStr as _;

    use super::*;

    fn pattern_of(cron: &Cron) -> &CronPattern {
        cron.pattern().expect("a field based expression")
    }

    fn values(component: &CronComponent) -> Vec<u32> {
        component.values().collect()
    }

    #[test]
    fn test_cron_pattern_new() {
        let cron = Cron::from_str("*/5 * * * *").unwrap();
        let pattern = pattern_of(&cron);
        assert_eq!(pattern.as_str(), "*/5 * * * *");
        assert!(pattern.seconds().is_full_range());
        assert_eq!(values(pattern.minutes()), (0..60).step_by(5).collect::<Vec<_>>());
        assert!(pattern.years().is_full_range());
    }

    #[test]
    fn test_cron_pattern_with_seconds() {
        let cron = CronParser::builder()
            .seconds(true)
            .build()
            .parse("* */5 * * * *")
            .unwrap();
        let pattern = pattern_of(&cron);
        assert!(pattern.has_seconds());
        assert!(pattern.seconds().is_full_range());
        assert!(pattern.minutes().contains(5));
        assert!(!pattern.minutes().contains(6));
    }

    #[test]
    fn test_cron_pattern_tostring() {
        let cron = Cron::from_str("*/5 * * * *").unwrap();
        assert_eq!(cron.to_string(), "*/5 * * * *");
    }

    #[test]
    fn test_cron_pattern_step_from_value() {
        let cron = Cron::from_str("5/15 * * * *").unwrap();
        assert_eq!(values(pattern_of(&cron).minutes()), vec![15, 30, 45]);
    }

    #[test]
    fn test_cron_pattern_parse() {
        let cron = Cron::from_str("*/15 1 1,15 1 1-5").unwrap();
        let pattern = pattern_of(&cron);
        assert_eq!(values(pattern.minutes()), vec![0, 15, 30, 45]);
        assert_eq!(values(pattern.hours()), vec![1]);
        assert_eq!(values(pattern.days()), vec![1, 15]);
        assert_eq!(values(pattern.months()), vec![1]);
        assert_eq!(values(pattern.days_of_week()), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_cron_pattern_extra_whitespace() {
        let cron = Cron::from_str("  */15  1 1,15 1    1-5    ").unwrap();
        let pattern = pattern_of(&cron);
        assert_eq!(values(pattern.hours()), vec![1]);
        assert_eq!(values(pattern.days()), vec![1, 15]);
        assert_eq!(values(pattern.days_of_week()), vec![1, 2, 3, 4, 5]);
        assert!(pattern.years().is_full_range());
    }

    #[test]
    fn test_cron_pattern_leading_zeros() {
        let cron = Cron::from_str("  */15  01 01,15 01    01-05    ").unwrap();
        let pattern = pattern_of(&cron);
        assert_eq!(values(pattern.hours()), vec![1]);
        assert_eq!(values(pattern.days()), vec![1, 15]);
        assert_eq!(values(pattern.months()), vec![1]);
        assert_eq!(values(pattern.days_of_week()), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_full_range_collapse() {
        let cron = Cron::from_str("0-59 0-23 1-31 1-12 0-6").unwrap();
        let pattern = pattern_of(&cron);
        assert!(pattern.minutes().is_full_range());
        assert!(pattern.hours().is_full_range());
        assert!(pattern.days().is_full_range());
        assert!(pattern.months().is_full_range());
        assert!(pattern.days_of_week().is_full_range());

        let cron = Cron::from_str("5,0-59,7 * * * *").unwrap();
        assert!(pattern_of(&cron).minutes().is_full_range());
    }

    #[test]
    fn test_stepped_wildcard_is_not_full_range() {
        let cron = Cron::from_str("*/1 * * * *").unwrap();
        let minutes = pattern_of(&cron).minutes();
        assert!(!minutes.is_full_range());
        assert_eq!(minutes.values().count(), 60);
    }

    #[test]
    fn test_reversed_range_matches_nothing() {
        let cron = Cron::from_str("40-10 * * * *").unwrap();
        assert_eq!(pattern_of(&cron).minutes().values().count(), 0);
    }

    #[test]
    fn test_empty_trailing_fields_match_nothing() {
        let cron = Cron::from_str("0 0 * *").unwrap();
        let pattern = pattern_of(&cron);
        assert!(pattern.months().is_full_range());
        assert!(!pattern.days_of_week().is_full_range());
        assert!(!pattern.days_of_week().is_unspecified());
        assert_eq!(pattern.days_of_week().values().count(), 0);
    }

    #[test]
    fn test_cron_pattern_handle_nicknames() {
        for (alias, expansion) in [
            ("@yearly", "0 0 1 1 *"),
            ("@annually", "0 0 1 1 *"),
            ("@monthly", "0 0 1 * *"),
            ("@weekly", "0 0 * * 0"),
            ("@daily", "0 0 * * *"),
            ("@midnight", "0 0 * * *"),
            ("@hourly", "0 * * * *"),
        ] {
            let cron = Cron::from_str(alias).unwrap();
            assert_eq!(cron.as_str(), expansion);
        }
    }

    #[test]
    fn test_nicknames_ignore_parser_configuration() {
        let parser = CronParser::builder()
            .seconds(true)
            .one_based_day_of_week(true)
            .allow_both_day_fields(false)
            .build();
        let weekly = parser.parse("@WEEKLY").unwrap();
        assert_eq!(weekly, Cron::from_str("@weekly").unwrap());
        let pattern = pattern_of(&weekly);
        assert!(!pattern.has_seconds());
        assert_eq!(values(pattern.days_of_week()), vec![0]);
    }

    #[test]
    fn test_reboot_nickname() {
        let cron = CronParser::new().parse("  @reboot ").unwrap();
        assert!(matches!(cron, Cron::Reboot(_)));
        assert_eq!(cron.as_str(), "@reboot");
    }

    #[test]
    fn test_unknown_nickname() {
        assert_eq!(
            Cron::from_str("  @fortnightly"),
            Err(CronError::UnknownKeyword {
                keyword: "fortnightly".to_string(),
                position: 3
            })
        );
    }

    #[test]
    fn test_month_nickname_range() {
        let cron = Cron::from_str("0 0 * FEB-MAR *").unwrap();
        assert_eq!(values(pattern_of(&cron).months()), vec![2, 3]);
    }

    #[test]
    fn test_month_keywords_only_in_month_field() {
        assert_eq!(
            Cron::from_str("0 JAN * * *"),
            Err(CronError::UnknownKeyword {
                keyword: "JAN".to_string(),
                position: 2
            })
        );
    }

    #[test]
    fn test_weekday_range_sat_sun() {
        let cron = Cron::from_str("0 0 * * SAT-SUN").unwrap();
        assert_eq!(values(pattern_of(&cron).days_of_week()), vec![0, 6]);
    }

    #[test]
    fn test_seven_is_sunday() {
        let cron = Cron::from_str("* * * * 7").unwrap();
        assert_eq!(values(pattern_of(&cron).days_of_week()), vec![0]);

        let cron = Cron::from_str("* * * * 5-7").unwrap();
        assert_eq!(values(pattern_of(&cron).days_of_week()), vec![0, 5, 6]);
    }

    #[test]
    fn test_with_seconds_disabled_six_fields_is_year() {
        let cron = CronParser::new().parse("0 0 1 1 * 2030").unwrap();
        let pattern = pattern_of(&cron);
        assert!(!pattern.has_seconds());
        assert_eq!(values(pattern.years()), vec![2030]);
    }

    #[test]
    fn test_with_one_based_weekdays() {
        let parser = CronParser::builder().one_based_day_of_week(true).build();

        let cron = parser.parse("* * * * MON-FRI").unwrap();
        assert_eq!(values(pattern_of(&cron).days_of_week()), vec![1, 2, 3, 4, 5]);

        let cron = parser.parse("* * * * 2-6").unwrap();
        assert_eq!(values(pattern_of(&cron).days_of_week()), vec![1, 2, 3, 4, 5]);

        let cron = parser.parse("* * * * 1-7").unwrap();
        assert!(pattern_of(&cron).days_of_week().is_full_range());

        // Step sizes and ordinals are not shifted.
        let cron = parser.parse("* * ? * 1/2").unwrap();
        assert_eq!(values(pattern_of(&cron).days_of_week()), vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_one_based_weekdays_drop_zero() {
        let parser = CronParser::builder().one_based_day_of_week(true).build();
        let cron = parser.parse("* * * * 0").unwrap();
        assert_eq!(pattern_of(&cron).days_of_week().values().count(), 0);
    }

    #[test]
    fn test_day_of_month_modifiers() {
        let cron = Cron::from_str("0 0 L * *").unwrap();
        assert!(matches!(
            pattern_of(&cron).days().kind(),
            FieldKind::DayOfMonth { last_day: true, .. }
        ));

        let cron = Cron::from_str("0 0 15w * *").unwrap();
        assert!(matches!(
            pattern_of(&cron).days().kind(),
            FieldKind::DayOfMonth {
                nearest_weekday: Some(15),
                ..
            }
        ));

        let cron = Cron::from_str("0 0 ? * MON").unwrap();
        assert!(pattern_of(&cron).days().is_unspecified());
    }

    #[test]
    fn test_day_of_week_modifiers() {
        let cron = Cron::from_str("0 0 ? * 5L,FRI#3,2#2").unwrap();
        let FieldKind::DayOfWeek { last, nth, .. } = pattern_of(&cron).days_of_week().kind() else {
            panic!("day-of-week field expected");
        };
        assert_eq!(last.iter().copied().collect::<Vec<_>>(), vec![5]);
        assert_eq!(
            nth.iter()
                .map(|(weekday, ordinals)| (*weekday, ordinals.iter().copied().collect()))
                .collect::<Vec<(u32, Vec<u32>)>>(),
            vec![(2, vec![2]), (5, vec![3])]
        );
    }

    #[test]
    fn test_nth_out_of_range() {
        assert_eq!(
            Cron::from_str("0 0 ? * 5#6"),
            Err(CronError::Grammar {
                message: "occurrence must be between 1 and 5",
                position: 10
            })
        );
        assert!(Cron::from_str("0 0 ? * 5#0").is_err());
    }

    #[test]
    fn test_question_mark_allowed_in_day_fields() {
        assert!(Cron::from_str("* * ? * *").is_ok());
        assert!(Cron::from_str("* * * * ?").is_ok());
    }

    #[test]
    fn test_question_mark_disallowed_in_minute() {
        assert_eq!(
            Cron::from_str("? * * * *"),
            Err(CronError::UnexpectedToken {
                token: TokenKind::Unspecified,
                position: 0
            })
        );
    }

    #[test]
    fn test_modifiers_disallowed_elsewhere() {
        assert!(Cron::from_str("* L * * *").is_err());
        assert!(Cron::from_str("* * * L *").is_err());
        assert!(Cron::from_str("* * 5#2 * *").is_err());
        assert!(Cron::from_str("* * * * 5W").is_err());
    }

    #[test]
    fn test_case_sensitivity_lowercase_special_character_ok() {
        assert!(Cron::from_str("* * 15w * *").is_ok());
        assert!(Cron::from_str("* * 15W * *").is_ok());
        assert!(Cron::from_str("0 0 * jan-mar mon-fri").is_ok());
    }

    #[test]
    fn test_source_is_stored_uppercased() {
        let lower = Cron::from_str("0 0 * jan-mar mon-fri").unwrap();
        let upper = Cron::from_str("0 0 * JAN-MAR MON-FRI").unwrap();
        assert_eq!(lower.as_str(), "0 0 * JAN-MAR MON-FRI");
        assert_eq!(lower, upper);

        let mut lower_hasher = DefaultHasher::new();
        let mut upper_hasher = DefaultHasher::new();
        lower.hash(&mut lower_hasher);
        upper.hash(&mut upper_hasher);
        assert_eq!(lower_hasher.finish(), upper_hasher.finish());
    }

    #[test]
    fn test_illegal_character_position() {
        assert_eq!(
            Cron::from_str("0 0 4X * *"),
            Err(CronError::UnexpectedCharacter {
                character: 'X',
                position: 5
            })
        );
        assert_eq!(
            Cron::from_str("0 0 4 * $"),
            Err(CronError::UnexpectedCharacter {
                character: '$',
                position: 8
            })
        );
    }

    #[test]
    fn test_dangling_operators() {
        assert_eq!(
            Cron::from_str("1- * * * *"),
            Err(CronError::Grammar {
                message: "expected a number after '-'",
                position: 2
            })
        );
        assert_eq!(
            Cron::from_str("*/ * * * *"),
            Err(CronError::Grammar {
                message: "expected a number after '/'",
                position: 2
            })
        );
        assert_eq!(
            Cron::from_str("*/0 * * * *"),
            Err(CronError::Grammar {
                message: "step must be greater than zero",
                position: 2
            })
        );
    }

    #[test]
    fn test_list_requires_item_after_separator() {
        assert_eq!(
            Cron::from_str("1, * * * *"),
            Err(CronError::UnexpectedToken {
                token: TokenKind::FieldSeparator,
                position: 2
            })
        );
    }

    #[test]
    fn test_year_support() {
        let parser = CronParser::builder().seconds(true).build();
        // 7-field pattern
        let cron = parser.parse("0 0 0 1 1 * 2025").unwrap();
        assert_eq!(values(pattern_of(&cron).years()), vec![2025]);
        // 6-field pattern, year defaults to full range
        let cron = parser.parse("0 0 0 1 1 *").unwrap();
        assert!(pattern_of(&cron).years().is_full_range());
        // Years outside the supported span are dropped.
        let cron = parser.parse("0 0 0 1 1 * 1969,2100").unwrap();
        assert_eq!(pattern_of(&cron).years().values().count(), 0);
    }

    #[test]
    fn test_trailing_input() {
        assert_eq!(
            Cron::from_str("0 0 1 1 * 2025 7"),
            Err(CronError::TrailingInput { position: 15 })
        );
    }

    #[test]
    fn test_empty_pattern() {
        assert_eq!(Cron::from_str(""), Err(CronError::EmptyPattern));
        assert_eq!(Cron::from_str("   "), Err(CronError::EmptyPattern));
    }

    #[test]
    fn test_both_day_fields_disallowed() {
        let parser = CronParser::builder().allow_both_day_fields(false).build();
        assert_eq!(
            parser.parse("0 0 1 * MON"),
            Err(CronError::ConflictingDayFields)
        );
        assert_eq!(parser.parse("0 0 * * *"), Err(CronError::ConflictingDayFields));
        assert!(parser.parse("0 0 1 * ?").is_ok());
        assert!(parser.parse("0 0 ? * MON").is_ok());
        assert!(parser.parse("@daily").is_ok());
    }

    #[test]
    fn test_is_valid() {
        let parser = CronParser::new();
        assert!(parser.is_valid("*/10 * * * *"));
        assert!(parser.is_valid("@reboot"));
        assert!(!parser.is_valid("* * * * * * * *"));
        assert!(!parser.is_valid("0 0 4X * *"));
    }

    #[test]
    fn test_builder_defaults() {
        assert_eq!(CronParser::builder().build(), CronParser::new());
        assert!(CronParser::new().allow_both_day_fields);
        assert!(!CronParser::new().seconds);
    }
}
