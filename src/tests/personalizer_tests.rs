//! tests/personalizer_tests.rs

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::models::campaign_model::{CampaignVariables, Recipient};
    use crate::services::personalizer::{render, render_subject};
    use crate::services::template_store::TemplateStore;

    fn sender_vars() -> CampaignVariables {
        CampaignVariables::new()
            .with("sender_name", "Jane")
            .with("sender_name_fr", "Jeanne")
            .with("sender_title", "Engineer")
    }

    #[test]
    fn substitutes_recipient_and_campaign_values() {
        let r = Recipient::new("John", "john@example.com").with("company", "TechCorp");
        let out = render(
            "Hi {name} at {company}, {sender_name} here",
            &r,
            "en",
            Some(&sender_vars()),
        );
        assert_eq!(out, "Hi John at TechCorp, Jane here");
    }

    #[test]
    fn source_info_is_derived_from_source_column() {
        let with_source = Recipient::new("John", "john@example.com").with("source", "LinkedIn");
        let without = Recipient::new("Ann", "ann@example.com");

        assert_eq!(
            render("profile{source_info}.", &with_source, "en", None),
            "profile on LinkedIn."
        );
        assert_eq!(render("profile{source_info}.", &without, "en", None), "profile.");
    }

    #[test]
    fn unresolved_placeholders_are_removed() {
        let r = Recipient::new("John", "john@example.com");
        let out = render("Dear {name}, {missing} ok {}", &r, "en", None);
        assert_eq!(out, "Dear John,  ok ");
        assert!(!out.contains('{'));
    }

    #[test]
    fn braces_coming_from_values_never_survive() {
        let r = Recipient::new("John", "john@example.com").with("company", "{evil}");
        let out = render("At {company}!", &r, "en", None);
        assert_eq!(out, "At !");
    }

    #[test]
    fn localized_sender_values_override_base_ones() {
        let r = Recipient::new("Marie", "marie@example.fr");
        let vars = sender_vars();
        assert_eq!(render("{sender_name}", &r, "fr", Some(&vars)), "Jeanne");
        assert_eq!(render("{sender_name}", &r, "en", Some(&vars)), "Jane");
    }

    #[test]
    fn recipient_fields_win_over_campaign_variables() {
        let vars = CampaignVariables::new().with("company", "Default Co");
        let r = Recipient::new("John", "john@example.com").with("company", "Real Co");
        assert_eq!(render("{company}", &r, "en", Some(&vars)), "Real Co");

        let empty = Recipient::new("John", "john@example.com").with_null("company");
        assert_eq!(render("[{company}]", &empty, "en", Some(&vars)), "[]");
    }

    #[test]
    fn subject_is_one_of_the_language_variants() {
        let mut store = TemplateStore::new();
        store.set_template("en", "body");
        store.set_subjects("en", &["A {name}", "B {name}", "C {name}"]);
        let r = Recipient::new("John", "john@example.com");
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            let subject = render_subject(&store, &r, "en", None, &mut rng);
            assert!(["A John", "B John", "C John"].contains(&subject.as_str()));
        }
    }

    #[test]
    fn subject_falls_back_to_english_then_sender_name() {
        let mut store = TemplateStore::new();
        store.set_template("en", "body");
        store.set_template("fr", "corps");
        store.set_subjects("en", &["Hello {name}"]);
        let r = Recipient::new("Marie", "marie@example.fr");
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            render_subject(&store, &r, "fr", None, &mut rng),
            "Hello Marie"
        );

        let mut bare = TemplateStore::new();
        bare.set_template("fr", "corps");
        assert_eq!(
            render_subject(&bare, &r, "fr", Some(&sender_vars()), &mut rng),
            "Jeanne"
        );
    }
}
