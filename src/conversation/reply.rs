//! Outbound reply composition.
//!
//! `Reply` is transport-agnostic: text plus an optional reply keyboard as
//! rows of button labels. The telegram module maps it onto teloxide types.

use fluent_templates::fluent_bundle::FluentArgs;
use unic_langid::LanguageIdentifier;

use crate::conversation::state::Rating;
use crate::conversation::transfer::SearchTermType;
use crate::i18n;

/// One outbound message: text and an optional reply keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Vec<Vec<String>>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Vec<Vec<String>>) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Builds localized replies and button labels from translation keys.
///
/// Every conversation step goes through this builder so that button
/// matching (input text vs. rendered label) stays consistent.
#[derive(Debug, Clone)]
pub struct ReplyBuilder {
    lang: LanguageIdentifier,
}

impl ReplyBuilder {
    pub fn new(lang: LanguageIdentifier) -> Self {
        Self { lang }
    }

    pub fn lang(&self) -> &LanguageIdentifier {
        &self.lang
    }

    pub fn t(&self, key: &str) -> String {
        i18n::t(&self.lang, key)
    }

    // Button labels. Input matching compares against these exact strings.

    pub fn yes_button(&self) -> String {
        self.t("keyboard.yes")
    }

    pub fn no_button(&self) -> String {
        self.t("keyboard.no")
    }

    pub fn prev_button(&self) -> String {
        self.t("keyboard.prev")
    }

    pub fn next_button(&self) -> String {
        self.t("keyboard.next")
    }

    pub fn help_button(&self) -> String {
        self.t("keyboard.help")
    }

    pub fn cancel_button(&self) -> String {
        self.t("keyboard.cancel")
    }

    pub fn remove_button(&self, term: &str) -> String {
        let mut args = FluentArgs::new();
        args.set("term", term);
        i18n::t_args(&self.lang, "keyboard.remove", &args)
    }

    /// Label of a menu command button, e.g. `keyboard.search`
    pub fn command_button(&self, key: &str) -> String {
        self.t(&format!("keyboard.{key}"))
    }

    pub fn type_button(&self, term_type: SearchTermType) -> String {
        self.t(&term_type.trans_key())
    }

    pub fn rating_button(&self, rating: Rating) -> String {
        self.t(&rating.trans_key())
    }

    /// The default action menu shown after every terminal transition.
    pub fn action_menu(&self) -> Reply {
        Reply::with_keyboard(
            self.t("query.action"),
            vec![
                vec![self.command_button("create")],
                vec![self.command_button("search")],
                vec![self.command_button("restart")],
            ],
        )
    }

    /// A step prompt: query text plus the step's keyboard.
    pub fn query(&self, key: &str, keyboard: Vec<Vec<String>>) -> Reply {
        Reply::with_keyboard(self.t(key), keyboard)
    }

    /// Generic wrong-input notice.
    pub fn wrong(&self) -> Reply {
        Reply::text(self.t("reply.wrong"))
    }

    /// Help banner for a step: title, the step's own help text, and a hint
    /// whether the step expects typed input or a keyboard choice.
    pub fn help(&self, step_key: &str, keyboard_step: bool) -> Reply {
        let usage = if keyboard_step {
            self.t("help.use_keyboard")
        } else {
            self.t("help.use_input")
        };
        Reply::text(format!(
            "{}\n\n{}\n\n{}",
            self.t("help.title"),
            self.t(&format!("help.{step_key}")),
            usage
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::lang_from_code;

    fn builder() -> ReplyBuilder {
        ReplyBuilder::new(lang_from_code("en"))
    }

    #[test]
    fn action_menu_lists_menu_commands() {
        let menu = builder().action_menu();
        let keyboard = menu.keyboard.unwrap();
        assert_eq!(keyboard.len(), 3);
        assert_eq!(keyboard[0][0], builder().command_button("create"));
        assert_eq!(keyboard[1][0], builder().command_button("search"));
    }

    #[test]
    fn remove_button_embeds_term() {
        assert!(builder().remove_button("john_doe").contains("john_doe"));
    }

    #[test]
    fn help_mentions_title_and_usage_hint() {
        let help = builder().help("search_term", false);
        assert!(help.text.contains(&builder().t("help.title")));
        assert!(help.text.contains(&builder().t("help.use_input")));

        let help = builder().help("confirm", true);
        assert!(help.text.contains(&builder().t("help.use_keyboard")));
    }
}
