//! English surface forms: nouns, verbs, adjectives.
//!
//! Noun pipeline:  base form → [override?] → [pluralize?] → [possessive?] → [article?]
//! Verb pipeline:  base form → [override?] → conjugate
//! Adj pipeline:   base form → [override?] → compare
//!
//! The irregular tables carry the forms regular rules cannot derive; the
//! `declension_override` entity property always wins over both.

use crate::linguistics::{check_override, SurfaceForm};
use crate::model::meta::{get_str, MetaMap};

/// Irregular verbs: base → (past, past participle, present participle, 3sg).
const IRREGULAR_VERBS: &[(&str, [&str; 4])] = &[
    ("be", ["was", "been", "being", "is"]),
    ("have", ["had", "had", "having", "has"]),
    ("do", ["did", "done", "doing", "does"]),
    ("go", ["went", "gone", "going", "goes"]),
    ("say", ["said", "said", "saying", "says"]),
    ("get", ["got", "gotten", "getting", "gets"]),
    ("make", ["made", "made", "making", "makes"]),
    ("know", ["knew", "known", "knowing", "knows"]),
    ("think", ["thought", "thought", "thinking", "thinks"]),
    ("take", ["took", "taken", "taking", "takes"]),
    ("see", ["saw", "seen", "seeing", "sees"]),
    ("come", ["came", "come", "coming", "comes"]),
    ("give", ["gave", "given", "giving", "gives"]),
    ("find", ["found", "found", "finding", "finds"]),
    ("tell", ["told", "told", "telling", "tells"]),
    ("write", ["wrote", "written", "writing", "writes"]),
    ("run", ["ran", "run", "running", "runs"]),
    ("begin", ["began", "begun", "beginning", "begins"]),
    ("break", ["broke", "broken", "breaking", "breaks"]),
    ("bring", ["brought", "brought", "bringing", "brings"]),
    ("buy", ["bought", "bought", "buying", "buys"]),
    ("build", ["built", "built", "building", "builds"]),
    ("choose", ["chose", "chosen", "choosing", "chooses"]),
    ("cut", ["cut", "cut", "cutting", "cuts"]),
    ("draw", ["drew", "drawn", "drawing", "draws"]),
    ("drink", ["drank", "drunk", "drinking", "drinks"]),
    ("drive", ["drove", "driven", "driving", "drives"]),
    ("eat", ["ate", "eaten", "eating", "eats"]),
    ("fall", ["fell", "fallen", "falling", "falls"]),
    ("feel", ["felt", "felt", "feeling", "feels"]),
    ("fly", ["flew", "flown", "flying", "flies"]),
    ("forget", ["forgot", "forgotten", "forgetting", "forgets"]),
    ("grow", ["grew", "grown", "growing", "grows"]),
    ("hear", ["heard", "heard", "hearing", "hears"]),
    ("hide", ["hid", "hidden", "hiding", "hides"]),
    ("hold", ["held", "held", "holding", "holds"]),
    ("keep", ["kept", "kept", "keeping", "keeps"]),
    ("lead", ["led", "led", "leading", "leads"]),
    ("leave", ["left", "left", "leaving", "leaves"]),
    ("let", ["let", "let", "letting", "lets"]),
    ("lie", ["lay", "lain", "lying", "lies"]),
    ("lose", ["lost", "lost", "losing", "loses"]),
    ("mean", ["meant", "meant", "meaning", "means"]),
    ("meet", ["met", "met", "meeting", "meets"]),
    ("pay", ["paid", "paid", "paying", "pays"]),
    ("put", ["put", "put", "putting", "puts"]),
    ("read", ["read", "read", "reading", "reads"]),
    ("ride", ["rode", "ridden", "riding", "rides"]),
    ("rise", ["rose", "risen", "rising", "rises"]),
    ("sell", ["sold", "sold", "selling", "sells"]),
    ("send", ["sent", "sent", "sending", "sends"]),
    ("set", ["set", "set", "setting", "sets"]),
    ("show", ["showed", "shown", "showing", "shows"]),
    ("sing", ["sang", "sung", "singing", "sings"]),
    ("sit", ["sat", "sat", "sitting", "sits"]),
    ("sleep", ["slept", "slept", "sleeping", "sleeps"]),
    ("speak", ["spoke", "spoken", "speaking", "speaks"]),
    ("spend", ["spent", "spent", "spending", "spends"]),
    ("stand", ["stood", "stood", "standing", "stands"]),
    ("swim", ["swam", "swum", "swimming", "swims"]),
    ("teach", ["taught", "taught", "teaching", "teaches"]),
    ("throw", ["threw", "thrown", "throwing", "throws"]),
    ("understand", ["understood", "understood", "understanding", "understands"]),
    ("wake", ["woke", "woken", "waking", "wakes"]),
    ("wear", ["wore", "worn", "wearing", "wears"]),
    ("win", ["won", "won", "winning", "wins"]),
];

/// Irregular adjective/adverb comparison: base → (comparative, superlative).
const IRREGULAR_COMPARISONS: &[(&str, [&str; 2])] = &[
    ("good", ["better", "best"]),
    ("bad", ["worse", "worst"]),
    ("far", ["farther", "farthest"]),
    ("little", ["less", "least"]),
    ("much", ["more", "most"]),
    ("many", ["more", "most"]),
    ("well", ["better", "best"]),
    ("badly", ["worse", "worst"]),
    ("old", ["older", "oldest"]),
    ("late", ["later", "latest"]),
];

/// Irregular noun plurals, including zero-plural nouns.
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("person", "people"),
    ("mouse", "mice"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("goose", "geese"),
    ("ox", "oxen"),
    ("datum", "data"),
    ("analysis", "analyses"),
    ("basis", "bases"),
    ("crisis", "crises"),
    ("thesis", "theses"),
    ("criterion", "criteria"),
    ("phenomenon", "phenomena"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("appendix", "appendices"),
    ("leaf", "leaves"),
    ("knife", "knives"),
    ("wife", "wives"),
    ("life", "lives"),
    ("half", "halves"),
    ("shelf", "shelves"),
    ("wolf", "wolves"),
    ("sheep", "sheep"),
    ("deer", "deer"),
    ("fish", "fish"),
    ("series", "series"),
    ("species", "species"),
];

/// Generates the English surface form for a base form + features.
///
/// Feature keys: `number` (sg|pl), `case` (plain|poss), `article` (a|the),
/// `pos` (verb|adj), `tense`, `person`, `degree`. Property keys:
/// `countable` (yes|no), `declension_override`.
pub fn surface_form(base_form: &str, features: &MetaMap, properties: &MetaMap) -> SurfaceForm {
    if features.is_empty() {
        return SurfaceForm::plain(base_form, "no features; base form kept");
    }

    match get_str(features, "pos") {
        Some("verb") => conjugate_verb(base_form, features, properties),
        Some("adj") => compare_adjective(base_form, features, properties),
        _ => inflect_noun(base_form, features, properties),
    }
}

fn inflect_noun(base_form: &str, features: &MetaMap, properties: &MetaMap) -> SurfaceForm {
    let number = get_str(features, "number").unwrap_or("sg");
    let case = get_str(features, "case").unwrap_or("plain");
    let article = get_str(features, "article");

    let mut steps: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut text = base_form.to_string();

    let compound_key = if case == "poss" {
        format!("{number}:poss")
    } else {
        number.to_string()
    };
    let override_hit = check_override(properties, &compound_key)
        .map(|form| (form, compound_key.clone()))
        .or_else(|| {
            (number == "pl")
                .then(|| check_override(properties, "pl").map(|form| (form, "pl".to_string())))
                .flatten()
        });
    let mut possessive_done = false;

    if let Some((form, key)) = override_hit {
        possessive_done = key.ends_with(":poss");
        steps.push(format!("override `{key}` → {form}"));
        text = form;
    } else if number == "pl" {
        if is_proper_noun(&text) {
            steps.push("proper noun; pluralization skipped".to_string());
        } else if get_str(properties, "countable") == Some("no") {
            steps.push("uncountable; pluralization skipped".to_string());
        } else {
            text = pluralize(&text);
            steps.push(format!("pluralized → {text}"));
        }
    }

    if case == "poss" && !possessive_done {
        if text.ends_with('s') {
            text.push('\'');
        } else {
            text.push_str("'s");
        }
        steps.push(format!("possessive → {text}"));
    }

    match article {
        Some("a") => {
            let chosen = indefinite_article(&text);
            text = format!("{chosen} {text}");
            steps.push(format!("article → {text}"));
        }
        Some("the") => {
            text = format!("the {text}");
            steps.push(format!("article → {text}"));
        }
        Some(other) => warnings.push(format!("unknown article `{other}` ignored")),
        None => {}
    }

    if steps.is_empty() {
        steps.push("base form kept".to_string());
    }
    SurfaceForm {
        text,
        explanation: steps.join("; "),
        warnings,
    }
}

fn conjugate_verb(base_form: &str, features: &MetaMap, properties: &MetaMap) -> SurfaceForm {
    let tense = get_str(features, "tense").unwrap_or("present");
    let person = get_str(features, "person").unwrap_or("3sg");

    let override_key = match (tense, person) {
        ("present", "3sg") => "3sg",
        ("present", _) => "present",
        (other, _) => other,
    };
    if let Some(form) = check_override(properties, override_key) {
        return SurfaceForm::plain(form.clone(), format!("override `{override_key}` → {form}"));
    }

    let lower = base_form.to_lowercase();
    let irregular = IRREGULAR_VERBS
        .iter()
        .find(|(base, _)| *base == lower)
        .map(|(_, forms)| forms);

    let (text, rule) = match tense {
        "past" => match irregular {
            Some(forms) => (forms[0].to_string(), "irregular past"),
            None => (regular_past(&lower), "regular past"),
        },
        "past_participle" => match irregular {
            Some(forms) => (forms[1].to_string(), "irregular past participle"),
            // Regular verbs: past participle equals past.
            None => (regular_past(&lower), "regular past participle"),
        },
        "present_participle" => match irregular {
            Some(forms) => (forms[2].to_string(), "irregular present participle"),
            None => (regular_present_participle(&lower), "regular present participle"),
        },
        _ => {
            if person == "3sg" {
                match irregular {
                    Some(forms) => (forms[3].to_string(), "irregular 3sg present"),
                    None => (regular_3sg(&lower), "regular 3sg present"),
                }
            } else {
                (base_form.to_string(), "present; base form")
            }
        }
    };

    SurfaceForm::plain(text.clone(), format!("{rule} → {text}"))
}

fn compare_adjective(base_form: &str, features: &MetaMap, properties: &MetaMap) -> SurfaceForm {
    let Some(degree) = get_str(features, "degree") else {
        return SurfaceForm::plain(base_form, "no degree; base form kept");
    };
    if let Some(form) = check_override(properties, degree) {
        return SurfaceForm::plain(form.clone(), format!("override `{degree}` → {form}"));
    }

    let lower = base_form.to_lowercase();
    let irregular = IRREGULAR_COMPARISONS
        .iter()
        .find(|(base, _)| *base == lower)
        .map(|(_, forms)| forms);

    let (text, rule) = match degree {
        "comparative" => match irregular {
            Some(forms) => (forms[0].to_string(), "irregular comparative"),
            None => (regular_comparative(&lower), "regular comparative"),
        },
        "superlative" => match irregular {
            Some(forms) => (forms[1].to_string(), "irregular superlative"),
            None => (regular_superlative(&lower), "regular superlative"),
        },
        other => {
            return SurfaceForm {
                text: base_form.to_string(),
                explanation: "base form kept".to_string(),
                warnings: vec![format!("unknown degree `{other}`")],
            }
        }
    };
    SurfaceForm::plain(text.clone(), format!("{rule} → {text}"))
}

fn pluralize(noun: &str) -> String {
    let lower = noun.to_lowercase();
    if let Some((_, plural)) = IRREGULAR_PLURALS.iter().find(|(base, _)| *base == lower) {
        return (*plural).to_string();
    }
    if lower.ends_with('y') && !ends_with_vowel_then(&lower, 'y') {
        return format!("{}ies", &noun[..noun.len() - 1]);
    }
    if lower.ends_with("s")
        || lower.ends_with("sh")
        || lower.ends_with("ch")
        || lower.ends_with("x")
        || lower.ends_with("z")
    {
        return format!("{noun}es");
    }
    if lower.ends_with('o') && !ends_with_vowel_then(&lower, 'o') {
        return format!("{noun}es");
    }
    format!("{noun}s")
}

fn regular_past(verb: &str) -> String {
    if verb.ends_with('e') {
        return format!("{verb}d");
    }
    if verb.ends_with('y') && !ends_with_vowel_then(verb, 'y') {
        return format!("{}ied", &verb[..verb.len() - 1]);
    }
    if doubles_final_consonant(verb) {
        let last = verb.chars().last().expect("non-empty verb");
        return format!("{verb}{last}ed");
    }
    format!("{verb}ed")
}

fn regular_3sg(verb: &str) -> String {
    if verb.ends_with('s')
        || verb.ends_with("sh")
        || verb.ends_with("ch")
        || verb.ends_with('x')
        || verb.ends_with('z')
    {
        return format!("{verb}es");
    }
    if verb.ends_with('y') && !ends_with_vowel_then(verb, 'y') {
        return format!("{}ies", &verb[..verb.len() - 1]);
    }
    if verb.ends_with('o') {
        return format!("{verb}es");
    }
    format!("{verb}s")
}

fn regular_present_participle(verb: &str) -> String {
    if verb.ends_with("ie") {
        return format!("{}ying", &verb[..verb.len() - 2]);
    }
    if verb.ends_with('e') && !verb.ends_with("ee") {
        return format!("{}ing", &verb[..verb.len() - 1]);
    }
    if doubles_final_consonant(verb) {
        let last = verb.chars().last().expect("non-empty verb");
        return format!("{verb}{last}ing");
    }
    format!("{verb}ing")
}

fn regular_comparative(adj: &str) -> String {
    if !takes_er_est(adj) {
        return format!("more {adj}");
    }
    if adj.ends_with('e') {
        return format!("{adj}r");
    }
    if adj.ends_with('y') && !ends_with_vowel_then(adj, 'y') {
        return format!("{}ier", &adj[..adj.len() - 1]);
    }
    if doubles_final_consonant(adj) {
        let last = adj.chars().last().expect("non-empty adjective");
        return format!("{adj}{last}er");
    }
    format!("{adj}er")
}

fn regular_superlative(adj: &str) -> String {
    if !takes_er_est(adj) {
        return format!("most {adj}");
    }
    if adj.ends_with('e') {
        return format!("{adj}st");
    }
    if adj.ends_with('y') && !ends_with_vowel_then(adj, 'y') {
        return format!("{}iest", &adj[..adj.len() - 1]);
    }
    if doubles_final_consonant(adj) {
        let last = adj.chars().last().expect("non-empty adjective");
        return format!("{adj}{last}est");
    }
    format!("{adj}est")
}

/// Short adjectives (one syllable, or two ending in -y) take -er/-est.
fn takes_er_est(adj: &str) -> bool {
    let syllables = count_syllables(adj);
    syllables <= 1 || (syllables == 2 && adj.ends_with('y'))
}

/// CVC doubling heuristic for one-syllable stems (stop → stopped).
fn doubles_final_consonant(word: &str) -> bool {
    let chars: Vec<char> = word.chars().collect();
    let len = chars.len();
    if len < 2 {
        return false;
    }
    let last = chars[len - 1];
    let second_last = chars[len - 2];
    let third_last_is_vowel = len >= 3 && is_vowel(chars[len - 3]);
    "bdgklmnprt".contains(last) && is_vowel(second_last) && !third_last_is_vowel
}

fn count_syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count = 0;
    let mut prev_vowel = false;
    for ch in lower.chars() {
        let vowel = "aeiouy".contains(ch);
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }
    if lower.ends_with('e') && count > 1 {
        count -= 1;
    }
    count.max(1)
}

fn is_vowel(ch: char) -> bool {
    "aeiou".contains(ch)
}

fn ends_with_vowel_then(word: &str, last: char) -> bool {
    let chars: Vec<char> = word.chars().collect();
    let len = chars.len();
    len >= 2 && chars[len - 1] == last && is_vowel(chars[len - 2])
}

/// Multi-word names where every word is capitalized are proper nouns.
fn is_proper_noun(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.len() >= 2
        && words
            .iter()
            .all(|word| word.chars().next().is_some_and(char::is_uppercase))
}

/// a/an selection by initial sound heuristic.
fn indefinite_article(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    for silent_h in ["hour", "honest", "honor", "heir"] {
        if lower.starts_with(silent_h) {
            return "an";
        }
    }
    for consonant_sound in ["eu", "uni", "use", "user", "one", "once"] {
        if lower.starts_with(consonant_sound) {
            return "a";
        }
    }
    match lower.chars().next() {
        Some(first) if is_vowel(first) => "an",
        _ => "a",
    }
}

#[cfg(test)]
mod tests {
    use super::surface_form;
    use crate::model::meta::{MetaMap, MetaValue};

    fn features(pairs: &[(&str, &str)]) -> MetaMap {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), MetaValue::from(*value)))
            .collect()
    }

    #[test]
    fn regular_and_irregular_plurals() {
        let plural = features(&[("number", "pl")]);
        let empty = MetaMap::new();
        for (base, expected) in [
            ("book", "books"),
            ("city", "cities"),
            ("box", "boxes"),
            ("hero", "heroes"),
            ("child", "children"),
            ("analysis", "analyses"),
            ("sheep", "sheep"),
        ] {
            assert_eq!(surface_form(base, &plural, &empty).text, expected);
        }
    }

    #[test]
    fn uncountable_and_proper_nouns_skip_pluralization() {
        let plural = features(&[("number", "pl")]);
        let mut uncountable = MetaMap::new();
        uncountable.insert("countable".into(), MetaValue::from("no"));

        assert_eq!(surface_form("water", &plural, &uncountable).text, "water");
        assert_eq!(
            surface_form("Ada Lovelace", &plural, &MetaMap::new()).text,
            "Ada Lovelace"
        );
    }

    #[test]
    fn possessive_and_articles() {
        let empty = MetaMap::new();
        assert_eq!(
            surface_form("Ada", &features(&[("case", "poss")]), &empty).text,
            "Ada's"
        );
        assert_eq!(
            surface_form("Brutus", &features(&[("case", "poss")]), &empty).text,
            "Brutus'"
        );
        assert_eq!(
            surface_form("engine", &features(&[("article", "a")]), &empty).text,
            "an engine"
        );
        assert_eq!(
            surface_form("machine", &features(&[("article", "a")]), &empty).text,
            "a machine"
        );
        assert_eq!(
            surface_form("hour", &features(&[("article", "a")]), &empty).text,
            "an hour"
        );
        assert_eq!(
            surface_form("machine", &features(&[("article", "the")]), &empty).text,
            "the machine"
        );
    }

    #[test]
    fn plural_possessive_combines() {
        let result = surface_form(
            "writer",
            &features(&[("number", "pl"), ("case", "poss")]),
            &MetaMap::new(),
        );
        assert_eq!(result.text, "writers'");
    }

    #[test]
    fn verb_conjugation() {
        let empty = MetaMap::new();
        assert_eq!(
            surface_form("write", &features(&[("pos", "verb"), ("tense", "past")]), &empty).text,
            "wrote"
        );
        assert_eq!(
            surface_form("walk", &features(&[("pos", "verb"), ("tense", "past")]), &empty).text,
            "walked"
        );
        assert_eq!(
            surface_form("stop", &features(&[("pos", "verb"), ("tense", "past")]), &empty).text,
            "stopped"
        );
        assert_eq!(
            surface_form("try", &features(&[("pos", "verb"), ("tense", "past")]), &empty).text,
            "tried"
        );
        assert_eq!(
            surface_form("go", &features(&[("pos", "verb")]), &empty).text,
            "goes"
        );
        assert_eq!(
            surface_form(
                "run",
                &features(&[("pos", "verb"), ("tense", "present_participle")]),
                &empty
            )
            .text,
            "running"
        );
        assert_eq!(
            surface_form(
                "speak",
                &features(&[("pos", "verb"), ("person", "1sg")]),
                &empty
            )
            .text,
            "speak"
        );
    }

    #[test]
    fn adjective_comparison() {
        let empty = MetaMap::new();
        assert_eq!(
            surface_form(
                "good",
                &features(&[("pos", "adj"), ("degree", "comparative")]),
                &empty
            )
            .text,
            "better"
        );
        assert_eq!(
            surface_form(
                "big",
                &features(&[("pos", "adj"), ("degree", "comparative")]),
                &empty
            )
            .text,
            "bigger"
        );
        assert_eq!(
            surface_form(
                "happy",
                &features(&[("pos", "adj"), ("degree", "superlative")]),
                &empty
            )
            .text,
            "happiest"
        );
        assert_eq!(
            surface_form(
                "beautiful",
                &features(&[("pos", "adj"), ("degree", "superlative")]),
                &empty
            )
            .text,
            "most beautiful"
        );
    }

    #[test]
    fn declension_override_wins() {
        let mut override_map = MetaMap::new();
        override_map.insert("pl".into(), MetaValue::from("persons"));
        let mut properties = MetaMap::new();
        properties.insert("declension_override".into(), MetaValue::Map(override_map));

        let result = surface_form("person", &features(&[("number", "pl")]), &properties);
        assert_eq!(result.text, "persons");
        assert!(result.explanation.contains("override"));
    }

    #[test]
    fn explanations_trace_the_pipeline() {
        let result = surface_form(
            "city",
            &features(&[("number", "pl"), ("article", "the")]),
            &MetaMap::new(),
        );
        assert_eq!(result.text, "the cities");
        assert!(result.explanation.contains("pluralized"));
        assert!(result.explanation.contains("article"));
    }
}
