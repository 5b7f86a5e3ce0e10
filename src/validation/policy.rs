use super::timing::MessageTiming;

/// Sender allow-listing rules. All entries are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct ValidationPolicy {
    pub allowed_domains: Vec<String>,
    pub domain_patterns: Vec<String>,
    pub allowed_emails: Vec<String>,
    pub excluded_emails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderCheck {
    pub allowed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub should_process: bool,
    pub reason: String,
    pub timing: MessageTiming,
}

impl ValidationPolicy {
    pub fn new<I, S>(allowed_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_domains: normalize_all(allowed_domains),
            ..Self::default()
        }
    }

    pub fn with_domain_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.domain_patterns = normalize_all(patterns);
        self
    }

    pub fn with_allowed_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_emails = normalize_all(emails);
        self
    }

    pub fn with_excluded_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_emails = normalize_all(emails);
        self
    }

    pub fn from_env() -> Self {
        Self::new(env_list("RESPONDER_ALLOWED_DOMAINS"))
            .with_domain_patterns(env_list("RESPONDER_DOMAIN_PATTERNS"))
            .with_allowed_emails(env_list("RESPONDER_ALLOWED_EMAILS"))
            .with_excluded_emails(env_list("RESPONDER_EXCLUDED_EMAILS"))
    }

    /// Deny-list first, then the explicit allow-list, then domain rules.
    pub fn check_sender(&self, email: &str) -> SenderCheck {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return SenderCheck::rejected("Invalid email format".to_string());
        }

        if self.excluded_emails.contains(&email) {
            return SenderCheck::rejected(format!("Excluded email: {email}"));
        }

        if self.allowed_emails.contains(&email) {
            return SenderCheck::allowed(format!("Allowed email: {email}"));
        }

        let Some(domain) = email_domain(&email) else {
            return SenderCheck::rejected("Invalid email format".to_string());
        };

        if self.allowed_domains.iter().any(|allowed| allowed == domain) {
            return SenderCheck::allowed(format!("Allowed domain: {domain}"));
        }

        if let Some(pattern) = self
            .domain_patterns
            .iter()
            .find(|pattern| domain.contains(pattern.as_str()))
        {
            return SenderCheck::allowed(format!(
                "Allowed domain (contains '{pattern}'): {domain}"
            ));
        }

        SenderCheck::rejected(format!("Domain not allowed: {domain}"))
    }

    pub fn should_process(&self, email: &str, timing: MessageTiming) -> ValidationResult {
        if !timing.is_initial_message {
            return ValidationResult {
                should_process: false,
                reason: "Not an initial message (5-second threshold not met)".to_string(),
                timing,
            };
        }

        let sender = self.check_sender(email);
        if !sender.allowed {
            return ValidationResult {
                should_process: false,
                reason: format!("Domain validation failed: {}", sender.reason),
                timing,
            };
        }

        ValidationResult {
            should_process: true,
            reason: format!("Processing allowed: Initial message from {}", sender.reason),
            timing,
        }
    }
}

impl SenderCheck {
    fn allowed(reason: String) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// `local@domain` with exactly one `@` and both sides non-empty.
fn email_domain(email: &str) -> Option<&str> {
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(domain)
}

fn normalize_all<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|value| value.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> ValidationPolicy {
        ValidationPolicy::new(["example.com", "example.nl"])
            .with_domain_patterns(["acme"])
            .with_allowed_emails(["friend@gmail.com"])
            .with_excluded_emails(["intern@example.com"])
    }

    #[test]
    fn exact_domain_is_allowed() {
        let check = policy().check_sender("Agent@Example.com ");
        assert!(check.allowed);
        assert_eq!(check.reason, "Allowed domain: example.com");
    }

    #[test]
    fn pattern_match_is_allowed() {
        let check = policy().check_sender("ops@mail.acme-group.io");
        assert!(check.allowed);
        assert_eq!(
            check.reason,
            "Allowed domain (contains 'acme'): mail.acme-group.io"
        );
    }

    #[test]
    fn explicit_email_is_allowed_outside_domains() {
        let check = policy().check_sender("friend@gmail.com");
        assert!(check.allowed);
        assert_eq!(check.reason, "Allowed email: friend@gmail.com");
    }

    #[test]
    fn excluded_email_wins_over_domain() {
        let check = policy().check_sender("intern@example.com");
        assert!(!check.allowed);
        assert_eq!(check.reason, "Excluded email: intern@example.com");
    }

    #[test]
    fn unknown_domain_and_garbage_are_rejected() {
        assert_eq!(
            policy().check_sender("someone@other.org").reason,
            "Domain not allowed: other.org"
        );
        assert_eq!(policy().check_sender("no-at-sign").reason, "Invalid email format");
        assert_eq!(policy().check_sender("a@b@c").reason, "Invalid email format");
        assert_eq!(policy().check_sender("   ").reason, "Invalid email format");
    }

    #[test]
    fn late_message_is_rejected_before_sender_check() {
        let result = policy().should_process("agent@example.com", MessageTiming::from_diff_ms(9_000));
        assert!(!result.should_process);
        assert_eq!(
            result.reason,
            "Not an initial message (5-second threshold not met)"
        );
    }

    #[test]
    fn initial_message_from_rejected_sender_explains_domain() {
        let result = policy().should_process("x@other.org", MessageTiming::from_diff_ms(100));
        assert!(!result.should_process);
        assert_eq!(
            result.reason,
            "Domain validation failed: Domain not allowed: other.org"
        );
    }

    #[test]
    fn initial_message_from_allowed_sender_is_processed() {
        let result = policy().should_process("agent@example.nl", MessageTiming::from_diff_ms(2_000));
        assert!(result.should_process);
        assert_eq!(
            result.reason,
            "Processing allowed: Initial message from Allowed domain: example.nl"
        );
        assert_eq!(result.timing.time_diff_ms, 2_000);
    }

    #[test]
    fn empty_policy_rejects_everyone() {
        let result = ValidationPolicy::default()
            .should_process("agent@example.com", MessageTiming::from_diff_ms(0));
        assert!(!result.should_process);
    }

    proptest! {
        #[test]
        fn decision_is_deterministic(email in "[a-z.@-]{0,24}", diff in -20_000i64..20_000) {
            let policy = policy();
            let timing = MessageTiming::from_diff_ms(diff);
            let first = policy.should_process(&email, timing);
            let second = policy.clone().should_process(&email, timing);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn late_messages_are_never_processed(email in "[a-z]{1,8}@example\\.com", diff in 5_001i64..1_000_000) {
            let result = policy().should_process(&email, MessageTiming::from_diff_ms(diff));
            prop_assert!(!result.should_process);
        }
    }
}
