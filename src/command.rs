use crate::{NodeId, Snag};
use std::str::FromStr;

/// The `Verb` enum names the commands the navigator understands, spelled the way the event bus
/// spells them.  [`strum_macros::EnumString`] does the parsing, so `"set-url"` becomes
/// [`Verb::SetUrl`] without any help from us.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Verb {
    DrillIn,
    DrillOut,
    Choose,
    Add,
    SetUrl,
    Reload,
    ClearCache,
    Search,
    SearchReset,
    NextPage,
}

impl Verb {
    /// Whether the verb takes an argument.
    pub fn takes_argument(&self) -> bool {
        matches!(
            self,
            Self::DrillIn | Self::DrillOut | Self::Choose | Self::SetUrl | Self::Search
        )
    }
}

/// Instructions for a [`crate::Navigator`].
///
/// Commands come from user interaction (drilling, choosing, paging) or from the embedding
/// application (set-url, reload, clear-cache, search).  In text form a command is its verb,
/// followed by an argument where one is needed: `drill-in 42`, `search big cats`, `reload`.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum Command {
    /// Move one level deeper, into the child with this id.
    #[display("drill-in {_0}")]
    DrillIn(NodeId),
    /// Move one level up, to the parent with this id.
    #[display("drill-out {_0}")]
    DrillOut(NodeId),
    /// Select a child without moving.
    #[display("choose {_0}")]
    Choose(NodeId),
    /// Ask the embedding application to add something under the current node.
    #[display("add")]
    Add,
    /// Point the navigator at a new root.
    #[display("set-url {_0}")]
    SetUrl(String),
    /// Refetch the current node, optionally emptying the cache first.
    #[display("reload{}", if *clear_cache { " --clear-cache" } else { "" })]
    Reload { clear_cache: bool },
    /// Empty the cache without touching the current column.
    #[display("clear-cache")]
    ClearCache,
    /// Filter the current column.
    #[display("search {_0}")]
    Search(String),
    /// Drop the search term and show the unfiltered column.
    #[display("search-reset")]
    SearchReset,
    /// Load the next page of the current column.
    #[display("next-page")]
    NextPage,
}

impl FromStr for Command {
    type Err = Snag;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let (verb, argument) = match text.split_once(char::is_whitespace) {
            Some((verb, argument)) => (verb, argument.trim()),
            None => (text, ""),
        };
        let verb = Verb::from_str(verb).map_err(|_| Snag::UnknownCommand(verb.to_string()))?;
        if verb.takes_argument() && argument.is_empty() {
            return Err(Snag::UnknownCommand(format!("{verb} needs an argument")));
        }
        let command = match verb {
            Verb::DrillIn => Self::DrillIn(argument.into()),
            Verb::DrillOut => Self::DrillOut(argument.into()),
            Verb::Choose => Self::Choose(argument.into()),
            Verb::Add => Self::Add,
            Verb::SetUrl => Self::SetUrl(argument.to_string()),
            Verb::Reload => Self::Reload {
                clear_cache: argument == "--clear-cache",
            },
            Verb::ClearCache => Self::ClearCache,
            Verb::Search => Self::Search(argument.to_string()),
            Verb::SearchReset => Self::SearchReset,
            Verb::NextPage => Self::NextPage,
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_event_bus_names() {
        assert_eq!(
            "drill-in 1".parse::<Command>().unwrap(),
            Command::DrillIn("1".into())
        );
        assert_eq!(
            "search  big cats ".parse::<Command>().unwrap(),
            Command::Search("big cats".to_string())
        );
        assert_eq!(
            "reload --clear-cache".parse::<Command>().unwrap(),
            Command::Reload { clear_cache: true }
        );
        assert_eq!("search-reset".parse::<Command>().unwrap(), Command::SearchReset);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(matches!(
            "dance".parse::<Command>(),
            Err(Snag::UnknownCommand(_))
        ));
        assert!(matches!(
            "drill-in".parse::<Command>(),
            Err(Snag::UnknownCommand(_))
        ));
    }

    #[test]
    fn reload_keeps_its_flag_in_text() {
        for clear_cache in [false, true] {
            let command = Command::Reload { clear_cache };
            assert_eq!(command.to_string().parse::<Command>().unwrap(), command);
        }
        assert_eq!(
            Command::Reload { clear_cache: true }.to_string(),
            "reload --clear-cache"
        );
    }

    #[test]
    fn every_verb_round_trips_its_name() {
        for verb in Verb::iter() {
            let name = verb.to_string();
            assert_eq!(Verb::from_str(&name).unwrap(), verb);
            if !verb.takes_argument() {
                let command = name.parse::<Command>().unwrap();
                assert!(command.to_string().starts_with(&name));
            }
        }
    }
}
