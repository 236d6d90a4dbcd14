use super::*;
use serde_json::json;

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn flat_values() -> BTreeMap<String, String> {
    values(&[
        ("invoice_number", "102"),
        ("invoice_date", "05/03/2025"),
        ("month", "marzo"),
        ("service_description", "LIMPIEZA"),
        ("address", "CALLE VERDI 15"),
        ("net_price", "100"),
        ("vat", "21,00"),
        ("total_price", "121.00"),
        ("payment_condition", "CONTADO"),
        ("payment_method", "TRANSFERENCIA"),
        ("account_number", "ES91 0000"),
        ("iban", "ES31"),
    ])
}

fn nested_values() -> BTreeMap<String, String> {
    let mut v = values(&[
        ("number", "7"),
        ("invoice_date", "01/02/2025"),
        ("month", "Febrero"),
        ("deadline", "28/02/2025"),
        ("client_info.total_price_description", "190.10"),
        ("client_info.net_price", "150.00"),
        ("client_info.vat21", "31.50"),
        ("client_info.total_price", "181.50"),
    ]);
    for spec in SchemaRevision::Nested.fields() {
        v.entry(spec.path.to_string()).or_insert_with(|| "X".to_string());
    }
    v
}

#[test]
fn empty_form_reports_every_field() {
    for revision in [SchemaRevision::Nested, SchemaRevision::Flat] {
        let errors = validate(revision, &BTreeMap::new());
        assert_eq!(errors.len(), revision.fields().len());
    }
    let errors = validate(SchemaRevision::Nested, &BTreeMap::new());
    assert_eq!(errors.get("number"), Some("Invoice number is required"));
    assert_eq!(errors.get("client_info.iban"), Some("IBAN is required"));
}

#[test]
fn whitespace_only_counts_as_empty() {
    let spec = SchemaRevision::Flat.field("address").expect("address field");
    assert_eq!(spec.check("   "), Err("Address is required".to_string()));
}

#[test]
fn numeric_rules_require_parseable_values() {
    let number = SchemaRevision::Flat.field("invoice_number").expect("field");
    assert!(number.check("102").is_ok());
    assert_eq!(number.check("10a"), Err("Invoice number must be a whole number".to_string()));
    assert!(number.check("-1").is_err());

    let price = SchemaRevision::Flat.field("net_price").expect("field");
    assert!(price.check("181,50").is_ok());
    assert!(price.check("181.50").is_ok());
    assert_eq!(price.check("abc"), Err("Net price must be a number".to_string()));
    assert!(price.check("NaN").is_err());
}

#[test]
fn dates_use_day_month_year() {
    let date = SchemaRevision::Nested.field("deadline").expect("field");
    assert!(date.check("31/01/2025").is_ok());
    assert_eq!(
        date.check("2025-01-31"),
        Err("Deadline must be a date in DD/MM/YYYY format".to_string())
    );
    assert!(date.check("31/02/2025").is_err());
}

#[test]
fn months_match_case_insensitively() {
    assert_eq!(canonical_month("septiembre"), Some("Septiembre"));
    assert_eq!(canonical_month(" ENERO "), Some("Enero"));
    assert_eq!(canonical_month("January"), None);
}

#[test]
fn flat_payload_converts_numbers() {
    let payload = build_payload(SchemaRevision::Flat, &flat_values()).expect("valid");
    let body = serde_json::to_value(&payload).expect("json");
    assert_eq!(body["invoice_number"], json!(102));
    assert_eq!(body["vat"], json!(21.0));
    assert_eq!(body["total_price"], json!(121.0));
    assert_eq!(body["month"], json!("Marzo"));
    assert_eq!(body["address"], json!("CALLE VERDI 15"));
}

#[test]
fn nested_payload_keeps_prices_as_strings() {
    let payload = build_payload(SchemaRevision::Nested, &nested_values()).expect("valid");
    let body = serde_json::to_value(&payload).expect("json");
    assert_eq!(body["number"], json!(7));
    assert_eq!(body["client_info"]["total_price"], json!("181.50"));
    assert_eq!(body["client_info"]["iban"], json!("X"));
    assert_eq!(body["deadline"], json!("28/02/2025"));
    assert!(body.get("invoice_number").is_none());
}

#[test]
fn invalid_values_block_payload() {
    let mut v = flat_values();
    v.insert("invoice_number".into(), "".into());
    let errors = build_payload(SchemaRevision::Flat, &v).expect_err("must fail");
    assert_eq!(errors.len(), 1);
    assert!(errors.get("invoice_number").is_some());
}

#[test]
fn client_fields_exclude_independent_fields() {
    let paths: Vec<&str> = SchemaRevision::Nested.client_fields().map(|f| f.path).collect();
    assert_eq!(paths.len(), 15);
    assert!(!paths.contains(&"number"));
    assert!(!paths.contains(&"month"));

    let flat: Vec<&str> = SchemaRevision::Flat.client_fields().map(|f| f.path).collect();
    assert!(!flat.contains(&"invoice_number"));
    assert!(flat.contains(&"service_description"));
}

#[test]
fn revision_names_parse() {
    assert_eq!(SchemaRevision::parse("FLAT"), Some(SchemaRevision::Flat));
    assert_eq!(SchemaRevision::parse("nested"), Some(SchemaRevision::Nested));
    assert_eq!(SchemaRevision::parse("v3"), None);
    assert_eq!(SchemaRevision::default().to_string(), "nested");
}
