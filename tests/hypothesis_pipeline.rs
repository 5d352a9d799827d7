use anyhow::Result;
use claimscope::hypothesis::{self, GroupComparison, TestPlan};
use claimscope::{io, logging::init_test_logging};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fs;
use tempfile::tempdir;

/// Four provinces; Limpopo's loss ratios sit well above the rest.
fn write_claims_csv(dir: &std::path::Path, seed: u64) -> Result<std::path::PathBuf> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.05)?;
    let provinces = [
        ("Gauteng", 0.4),
        ("Western Cape", 0.4),
        ("KwaZulu-Natal", 0.4),
        ("Limpopo", 1.2),
    ];

    let mut csv = String::from("Province,Gender,TotalClaims,loss_ratio\n");
    for i in 0..120 {
        let (province, mean) = provinces[i % provinces.len()];
        let gender = if i % 2 == 0 { "Male" } else { "Female" };
        let loss_ratio: f64 = mean + noise.sample(&mut rng);
        let claims = if i % 5 == 0 { String::new() } else { format!("{:.2}", (i % 3) as f64 * 50.0) };
        csv.push_str(&format!("{},{},{},{:.4}\n", province, gender, claims, loss_ratio));
    }
    let path = dir.join("cleaned.csv");
    fs::write(&path, csv)?;
    Ok(path)
}

#[test]
fn default_plan_reports_province_anova() -> Result<()> {
    init_test_logging();
    let tmp = tempdir()?;
    let df = io::read_tabular(write_claims_csv(tmp.path(), 11)?, &[])?;

    let results = hypothesis::run_all_tests(&df, &TestPlan::default())?;
    assert_eq!(results.len(), 1);
    let anova = results["province_anova"];
    assert!(anova.statistic > 100.0);
    assert!(anova.p_value < 0.05);

    let json = serde_json::to_string(&results)?;
    assert!(json.starts_with(r#"{"province_anova":{"statistic":"#));
    Ok(())
}

#[test]
fn opt_in_tests_are_keyed_by_request() -> Result<()> {
    init_test_logging();
    let tmp = tempdir()?;
    let mut df = io::read_tabular(write_claims_csv(tmp.path(), 3)?, &[])?;
    assert!(hypothesis::add_claim_indicator(&mut df)?);

    let plan = TestPlan {
        frequency_by: vec!["Province".into(), "mmcode".into()],
        comparisons: vec![
            "Gender=Male,Female".parse::<GroupComparison>()?,
            "Province=Limpopo,Gauteng".parse::<GroupComparison>()?,
        ],
        ..TestPlan::default()
    };
    let results = hypothesis::run_all_tests(&df, &plan)?;

    let keys: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "frequency_Province",
            "province_anova",
            "ttest_Gender_Male_vs_Female",
            "ttest_Province_Limpopo_vs_Gauteng",
        ]
    );

    // has_claim does not depend on province
    let freq = results["frequency_Province"];
    assert_eq!(freq.dof, Some(3.0));
    assert!(freq.p_value > 0.05);

    let limpopo = results["ttest_Province_Limpopo_vs_Gauteng"];
    assert!(limpopo.statistic > 0.0);
    assert!(limpopo.p_value < 1e-6);
    Ok(())
}

#[test]
fn unknown_group_is_skipped_not_fatal() -> Result<()> {
    let tmp = tempdir()?;
    let df = io::read_tabular(write_claims_csv(tmp.path(), 5)?, &[])?;

    let plan = TestPlan {
        comparisons: vec!["Province=Gauteng,Atlantis".parse()?],
        ..TestPlan::default()
    };
    let results = hypothesis::run_all_tests(&df, &plan)?;
    assert!(results.contains_key("province_anova"));
    assert!(!results.contains_key("ttest_Province_Gauteng_vs_Atlantis"));
    Ok(())
}
