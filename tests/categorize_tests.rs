use chartscope::categorize::{Categorizer, OTHER};
use chartscope::table::Table;

#[test]
fn keyword_rules() {
    let c = Categorizer::default();
    assert_eq!(c.classify("login failed from 10.0.0.1"), "Brute Force");
    assert_eq!(c.classify("Possible DDoS from botnet"), "DDoS");
    assert_eq!(c.classify("Port scan detected on 22"), "Port Scan");
    assert_eq!(c.classify("Large outbound transfer"), "Data Exfiltration");
    assert_eq!(c.classify("Malware signature hit"), "Malware");
}

#[test]
fn compliance_phrasing() {
    let c = Categorizer::default();
    assert_eq!(c.classify("Ticket was resolved within the 2 hours window"), "Compliant - Resolved");
    assert_eq!(c.classify("Ticket is open and resolution time has not started"), "Open - Not Started");
}

#[test]
fn classification_is_total() {
    let c = Categorizer::default();
    assert_eq!(c.classify("random unrelated text"), OTHER);
    assert_eq!(c.classify(""), OTHER);
}

#[test]
fn descriptive_columns_by_name_or_length() {
    let long = "a".repeat(60);
    let csv = format!("alert_description,severity,notes\nshort,High,{long}\nx,Low,{long}\n");
    let t = Table::from_csv(csv.as_bytes()).unwrap().normalize();
    let c = Categorizer::default();
    assert!(c.is_descriptive(&t, "alert_description"));
    assert!(!c.is_descriptive(&t, "severity"));
    assert!(c.is_descriptive(&t, "notes"));
    assert!(!c.clone().with_descriptive_min_len(100.0).is_descriptive(&t, "notes"));
}
