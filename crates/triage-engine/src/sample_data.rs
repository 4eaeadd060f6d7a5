//! Bundled training data used to bootstrap the classifier when no saved
//! model is available.

use triage_core::{Category, TrainingExample};

/// Balanced starter corpus: eight examples per business category plus a
/// handful of ambiguous `Other` texts.
pub const SAMPLE_TRAINING: &[(&str, Category)] = &[
    // Billing
    ("I was charged twice this month", Category::Billing),
    ("My invoice shows an incorrect amount", Category::Billing),
    ("Need help understanding my bill", Category::Billing),
    ("Please update my billing info", Category::Billing),
    ("Why was I charged for this?", Category::Billing),
    ("There is a duplicate charge on my account", Category::Billing),
    ("Can you explain these charges?", Category::Billing),
    ("I was not supposed to be billed for this", Category::Billing),
    // Technical
    ("App crashes when I try to upload a file", Category::Technical),
    ("Unable to login due to server error", Category::Technical),
    ("Getting 500 error on checkout", Category::Technical),
    ("My internet is not working", Category::Technical),
    ("The website is down", Category::Technical),
    ("Getting an error when trying to access the site", Category::Technical),
    ("App keeps freezing", Category::Technical),
    ("app keeps crashing", Category::Technical),
    // Account
    ("I want to change my account email", Category::Account),
    ("How do I reset my password?", Category::Account),
    ("Please help me update my profile details", Category::Account),
    ("I cannot login to my account", Category::Account),
    ("My password reset is not working", Category::Account),
    ("I need to update my account information", Category::Account),
    ("How do I change my email address?", Category::Account),
    ("I forgot my password", Category::Account),
    // Feature
    ("Can you add dark mode to the app?", Category::Feature),
    ("Request: export my data as CSV", Category::Feature),
    ("It would be great to have multi-language support", Category::Feature),
    ("Can you add a mobile app?", Category::Feature),
    ("I would like to see a search feature", Category::Feature),
    ("Please add a calendar view", Category::Feature),
    ("Can we have offline support?", Category::Feature),
    ("Please add bulk import functionality", Category::Feature),
    // Refund Request
    ("I'd like a refund for my last purchase", Category::RefundRequest),
    ("Request refund for order #12345", Category::RefundRequest),
    ("I was billed but didn't receive the service, please refund", Category::RefundRequest),
    ("I want my money back", Category::RefundRequest),
    ("Please refund my payment", Category::RefundRequest),
    ("Can I get a refund for this order?", Category::RefundRequest),
    ("Refund my subscription immediately", Category::RefundRequest),
    ("I need to cancel and get a refund", Category::RefundRequest),
    // Service Complaint
    ("Support ticket unresolved for days", Category::ServiceComplaint),
    ("Very poor customer service experience", Category::ServiceComplaint),
    ("Unhappy with the service quality", Category::ServiceComplaint),
    ("Your support team was rude", Category::ServiceComplaint),
    ("The service is terrible", Category::ServiceComplaint),
    ("Long wait times for support", Category::ServiceComplaint),
    ("Service quality has declined", Category::ServiceComplaint),
    ("Cannot reach customer support", Category::ServiceComplaint),
    // Other
    ("asdf", Category::Other),
    ("idk", Category::Other),
    ("hello", Category::Other),
    ("random stuff here", Category::Other),
    ("xyz abc", Category::Other),
    ("what is this", Category::Other),
    ("unclear request", Category::Other),
];

/// [`SAMPLE_TRAINING`] as owned training examples.
#[must_use]
pub fn sample_training_set() -> Vec<TrainingExample> {
    SAMPLE_TRAINING
        .iter()
        .map(|&(text, label)| TrainingExample::new(text, label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_business_category_has_eight_examples() {
        for category in Category::ALL {
            let count = SAMPLE_TRAINING.iter().filter(|(_, c)| *c == category).count();
            let expected = if category == Category::Other { 7 } else { 8 };
            assert_eq!(count, expected, "{category}");
        }
    }

    #[test]
    fn test_sample_training_set_matches_table() {
        let examples = sample_training_set();
        assert_eq!(examples.len(), SAMPLE_TRAINING.len());
        assert_eq!(examples[0].text, "I was charged twice this month");
        assert_eq!(examples[0].label, Category::Billing);
    }
}
