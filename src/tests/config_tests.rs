use crate::config::AppConfig;
use crate::placement::RankingCriterion;

#[test]
fn test_parse_ini() {
    let mut config = AppConfig::default();
    let ini = r#"
PORT="7200"
STORAGE_MAX_VMS="25"
STORAGE_MAX_PCT_USED="80"
HOST_SORT_ORDER="cpu_usage, memory_headroom"
STORAGE_SORT_ORDER="free_space_percentage"
UNKNOWN_KEY="ignored"
"#;
    config.parse_ini(ini);
    assert_eq!(config.port, 7200);
    assert_eq!(config.storage_max_vms, 25);
    assert_eq!(config.storage_max_pct_used, 80);
    assert_eq!(
        config.host_sort_order.criteria(),
        &[RankingCriterion::CpuUsage, RankingCriterion::MemoryHeadroom]
    );
    assert_eq!(config.storage_sort_order.criteria(), &[RankingCriterion::FreeSpacePercentage]);
}

#[test]
fn test_unparsable_values_keep_previous() {
    let mut config = AppConfig::default();
    config.parse_ini("STORAGE_MAX_VMS=\"lots\"\nSTORAGE_MAX_PCT_USED=\"300\"");
    assert_eq!(config.storage_max_vms, 0);
    assert_eq!(config.storage_max_pct_used, 100);
}

#[test]
fn test_unknown_criteria_are_dropped() {
    let mut config = AppConfig::default();
    config.parse_ini("HOST_SORT_ORDER=\"bogus,active_cpu\"");
    assert_eq!(config.host_sort_order.criteria(), &[RankingCriterion::ActiveCpu]);
}

#[test]
fn test_default_config_validates() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.port, 7190);
    assert_eq!(config.host_sort_order.to_string(), "active_memory,cpu_usage,memory_usage,random");
    assert_eq!(
        config.storage_sort_order.to_string(),
        "active_vm_count,free_space,free_space_percentage,random"
    );
}

#[test]
fn test_placement_settings_mirror_config() {
    let mut config = AppConfig::default();
    config.storage_max_vms = 10;
    config.storage_max_pct_used = 90;
    let settings = config.placement_settings();
    assert_eq!(settings.thresholds.storage_max_vms, 10);
    assert_eq!(settings.thresholds.storage_max_pct_used, 90);
    assert_eq!(settings.host_sort_order, config.host_sort_order);
    assert_eq!(settings.storage_sort_order, config.storage_sort_order);
}

#[test]
fn test_empty_sort_order_is_rejected() {
    let mut config = AppConfig::default();
    config.parse_ini("STORAGE_SORT_ORDER=\"\"");
    assert!(config.validate().is_err());
}

#[test]
fn test_storage_criterion_in_host_order_is_rejected() {
    let mut config = AppConfig::default();
    config.parse_ini("HOST_SORT_ORDER=\"free_space,cpu_usage\"");
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("free_space"));
}

#[test]
fn test_random_first_is_accepted() {
    let mut config = AppConfig::default();
    config.parse_ini("HOST_SORT_ORDER=\"random,cpu_usage\"");
    assert!(config.validate().is_ok());
}

#[test]
fn test_save_round_trips_through_parse() {
    let dir = std::env::temp_dir().join(format!("vm-placement-cfg-{}", std::process::id()));
    let mut config = AppConfig::default();
    config.config_path = dir.join("vm-placement.cfg").to_string_lossy().into_owned();
    config.storage_max_vms = 12;
    config.host_sort_order = crate::placement::SortOrder::parse_lenient("active_cpu,random");
    config.save().unwrap();

    let contents = std::fs::read_to_string(&config.config_path).unwrap();
    let mut reloaded = AppConfig::default();
    reloaded.parse_ini(&contents);
    assert_eq!(reloaded.storage_max_vms, 12);
    assert_eq!(reloaded.host_sort_order, config.host_sort_order);

    std::fs::remove_dir_all(&dir).ok();
}
