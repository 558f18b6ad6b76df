//! Base attribute templates copied into generated personas.

use ripple_types::PersonaAttributes;

fn template(
    archetype: &str,
    occupation: &str,
    age_band: &str,
    interests: &[&str],
    income_bracket: &str,
) -> PersonaAttributes {
    PersonaAttributes {
        archetype: String::from(archetype),
        occupation: String::from(occupation),
        age_band: String::from(age_band),
        interests: interests.iter().map(|s| String::from(*s)).collect(),
        income_bracket: String::from(income_bracket),
    }
}

/// The built-in template pool used when configuration supplies none.
pub fn default_template_pool() -> Vec<PersonaAttributes> {
    vec![
        template(
            "early adopter",
            "software engineer",
            "25-34",
            &["gadgets", "startups", "cricket"],
            "upper middle",
        ),
        template(
            "pragmatist",
            "small business owner",
            "35-44",
            &["finance", "family", "local news"],
            "middle",
        ),
        template(
            "student",
            "undergraduate",
            "18-24",
            &["music", "gaming", "social media"],
            "low",
        ),
        template(
            "homemaker",
            "household manager",
            "35-44",
            &["cooking", "television", "health"],
            "middle",
        ),
        template(
            "skeptic",
            "government employee",
            "45-54",
            &["politics", "newspapers", "savings"],
            "middle",
        ),
        template(
            "aspirer",
            "sales executive",
            "25-34",
            &["fashion", "travel", "fitness"],
            "upper middle",
        ),
        template(
            "traditionalist",
            "farmer",
            "55-64",
            &["agriculture", "weather", "religion"],
            "low",
        ),
        template(
            "professional",
            "doctor",
            "35-44",
            &["research", "investing", "travel"],
            "high",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_is_populated() {
        let pool = default_template_pool();
        assert_eq!(pool.len(), 8);
        assert!(pool.iter().all(|t| !t.interests.is_empty()));
    }
}
