//! Transcript → [`Command`] interpretation.
//!
//! The grammar is a prioritized rule table evaluated top to bottom; the
//! first rule whose trigger appears in the transcript wins. Several triggers
//! overlap ("leer" appears twice, "acelerar" is a substring of
//! "desacelerar"), so the order of [`RULES`] is part of the behaviour.

use once_cell::sync::Lazy;
use regex::Regex;

use super::command::{Command, Theme};

/// One entry of the rule table.
#[derive(Debug)]
pub enum Rule {
    /// Fires when any trigger phrase is a substring of the transcript.
    Keywords {
        triggers: &'static [&'static str],
        command: Command,
    },
    /// "ir a / página / toca" followed by digits or a spelled-out number.
    PageNumber,
}

pub static RULES: &[Rule] = &[
    Rule::Keywords {
        triggers: &["siguiente", "próxima", "avanzar"],
        command: Command::NextPage,
    },
    Rule::Keywords {
        triggers: &["anterior", "atrás", "retroceder"],
        command: Command::PreviousPage,
    },
    Rule::Keywords {
        triggers: &["reproducir", "play", "leer"],
        command: Command::Play,
    },
    Rule::Keywords {
        triggers: &["pausar", "pausa", "detener"],
        command: Command::Pause,
    },
    Rule::Keywords {
        triggers: &["parar", "stop"],
        command: Command::Stop,
    },
    Rule::Keywords {
        triggers: &["más rápido", "acelerar"],
        command: Command::IncreaseSpeed,
    },
    Rule::Keywords {
        triggers: &["más lento", "desacelerar"],
        command: Command::DecreaseSpeed,
    },
    Rule::Keywords {
        triggers: &["subir volumen", "más alto", "subir audio"],
        command: Command::IncreaseVolume,
    },
    Rule::Keywords {
        triggers: &["bajar volumen", "más bajo", "bajar audio"],
        command: Command::DecreaseVolume,
    },
    Rule::PageNumber,
    Rule::Keywords {
        triggers: &["leer", "reproducir"],
        command: Command::Play,
    },
    Rule::Keywords {
        triggers: &["menú", "menu", "opciones", "comandos"],
        command: Command::ShowHelp,
    },
    Rule::Keywords {
        triggers: &["aumentar", "zoom in", "más grande", "grande"],
        command: Command::ZoomIn,
    },
    Rule::Keywords {
        triggers: &["reducir", "zoom out", "más pequeño", "pequeño"],
        command: Command::ZoomOut,
    },
    Rule::Keywords {
        triggers: &["modo oscuro", "tema oscuro"],
        command: Command::SetTheme(Theme::Dark),
    },
    Rule::Keywords {
        triggers: &["modo claro", "tema claro"],
        command: Command::SetTheme(Theme::Light),
    },
    Rule::Keywords {
        triggers: &["alto contraste"],
        command: Command::SetTheme(Theme::HighContrast),
    },
    Rule::Keywords {
        triggers: &["modo sepia", "tema sepia"],
        command: Command::SetTheme(Theme::Sepia),
    },
    Rule::Keywords {
        triggers: &["biblioteca", "libros", "library", "mis libros"],
        command: Command::OpenLibrary,
    },
    Rule::Keywords {
        triggers: &["ayuda", "help", "comandos", "que puedo decir"],
        command: Command::ShowHelp,
    },
    Rule::Keywords {
        triggers: &["dónde estoy", "donde estoy", "qué libro", "que libro"],
        command: Command::WhereAmI,
    },
    Rule::Keywords {
        triggers: &["repite", "repetir"],
        command: Command::RepeatLastFeedback,
    },
];

static PAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:ir a|página|page|toca|página número|página num)\s*([0-9]+|uno|dos|tres|cuatro|cinco|seis|siete|ocho|nueve|diez)",
    )
    .expect("page pattern is valid")
});

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("uno", 1),
    ("dos", 2),
    ("tres", 3),
    ("cuatro", 4),
    ("cinco", 5),
    ("seis", 6),
    ("siete", 7),
    ("ocho", 8),
    ("nueve", 9),
    ("diez", 10),
];

impl Rule {
    /// Returns the command this rule yields for `transcript`, if it fires.
    pub fn apply(&self, transcript: &str) -> Option<Command> {
        match self {
            Rule::Keywords { triggers, command } => triggers
                .iter()
                .any(|trigger| transcript.contains(trigger))
                .then(|| command.clone()),
            Rule::PageNumber => page_number(transcript).and_then(Command::go_to_page),
        }
    }
}

/// Interpret a lower-cased, trimmed transcript.
///
/// Never fails: a transcript no rule accepts becomes
/// [`Command::Unrecognized`] carrying the raw text.
pub fn parse(transcript: &str) -> Command {
    RULES
        .iter()
        .find_map(|rule| rule.apply(transcript))
        .unwrap_or_else(|| Command::Unrecognized(transcript.to_string()))
}

fn page_number(transcript: &str) -> Option<u32> {
    let token = PAGE_RE.captures(transcript)?.get(1)?.as_str();
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse().ok();
    }
    NUMBER_WORDS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, value)| *value)
}

/// Phrases listed when the user asks for help.
pub fn available_commands() -> &'static [&'static str] {
    &[
        "siguiente página",
        "página anterior",
        "reproducir",
        "pausar",
        "parar",
        "más rápido",
        "más lento",
        "subir volumen",
        "bajar volumen",
        "ir a página [número]",
        "aumentar zoom",
        "reducir zoom",
        "modo oscuro",
        "modo claro",
        "alto contraste",
        "abrir biblioteca",
        "dónde estoy",
        "repite",
        "ayuda",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBER_NAMES: [&str; 10] = [
        "uno", "dos", "tres", "cuatro", "cinco", "seis", "siete", "ocho", "nueve", "diez",
    ];

    #[test]
    fn navigation_keywords_map_to_next_page() {
        for transcript in [
            "siguiente",
            "siguiente página",
            "la próxima por favor",
            "avanzar",
        ] {
            assert_eq!(parse(transcript), Command::NextPage, "{transcript}");
        }
    }

    #[test]
    fn previous_page_keywords() {
        assert_eq!(parse("página anterior"), Command::PreviousPage);
        assert_eq!(parse("vuelve atrás"), Command::PreviousPage);
        assert_eq!(parse("retroceder"), Command::PreviousPage);
    }

    #[test]
    fn toca_accepts_digits_and_words() {
        for n in 1..=10u32 {
            assert_eq!(parse(&format!("toca {n}")), Command::GoToPage(n));
            let word = NUMBER_NAMES[(n - 1) as usize];
            assert_eq!(parse(&format!("toca {word}")), Command::GoToPage(n));
        }
    }

    #[test]
    fn unknown_number_word_is_unrecognized() {
        assert_eq!(
            parse("toca once"),
            Command::Unrecognized("toca once".into())
        );
    }

    #[test]
    fn page_zero_falls_through() {
        assert_eq!(parse("toca 0"), Command::Unrecognized("toca 0".into()));
    }

    #[test]
    fn go_to_page_with_lead_in() {
        assert_eq!(parse("ir a página 3"), Command::GoToPage(3));
        assert_eq!(parse("página número 12"), Command::GoToPage(12));
        assert_eq!(parse("ir a siete"), Command::GoToPage(7));
    }

    #[test]
    fn pause_and_stop_keywords() {
        assert_eq!(parse("pausar"), Command::Pause);
        assert_eq!(parse("detener"), Command::Pause);
        assert_eq!(parse("parar"), Command::Stop);
        assert_eq!(parse("stop"), Command::Stop);
    }

    #[test]
    fn first_matching_rule_wins() {
        // "desacelerar" contains "acelerar", which the speed-up rule sees first.
        assert_eq!(parse("desacelerar"), Command::IncreaseSpeed);
        // Navigation outranks playback.
        assert_eq!(parse("leer la siguiente"), Command::NextPage);
        // Playback outranks the page-number rule.
        assert_eq!(parse("leer página 4"), Command::Play);
    }

    #[test]
    fn view_and_library_commands() {
        assert_eq!(parse("zoom in"), Command::ZoomIn);
        assert_eq!(parse("más pequeño"), Command::ZoomOut);
        assert_eq!(parse("modo oscuro"), Command::SetTheme(Theme::Dark));
        assert_eq!(parse("tema claro"), Command::SetTheme(Theme::Light));
        assert_eq!(parse("alto contraste"), Command::SetTheme(Theme::HighContrast));
        assert_eq!(parse("modo sepia"), Command::SetTheme(Theme::Sepia));
        assert_eq!(parse("abrir biblioteca"), Command::OpenLibrary);
        assert_eq!(parse("mis libros"), Command::OpenLibrary);
    }

    #[test]
    fn help_orientation_and_repeat() {
        assert_eq!(parse("menú"), Command::ShowHelp);
        assert_eq!(parse("ayuda"), Command::ShowHelp);
        assert_eq!(parse("dónde estoy"), Command::WhereAmI);
        assert_eq!(parse("qué libro es"), Command::WhereAmI);
        assert_eq!(parse("repite"), Command::RepeatLastFeedback);
    }

    #[test]
    fn gibberish_is_unrecognized_with_raw_text() {
        assert_eq!(
            parse("asdkjasd"),
            Command::Unrecognized("asdkjasd".into())
        );
    }

    #[test]
    fn volume_rules() {
        assert_eq!(parse("subir volumen"), Command::IncreaseVolume);
        assert_eq!(parse("un poco más bajo"), Command::DecreaseVolume);
    }
}
