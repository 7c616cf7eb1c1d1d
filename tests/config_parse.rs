use riscan_batch::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../riscan-batch.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.profile.out_dir, "pavd_output");
    assert_eq!(cfg.voxel.out_dir, "voxel_output");
    assert_eq!(cfg.voxel.nodata, -9999);
}

#[test]
fn example_config_matches_builtin_defaults() {
    let raw = include_str!("../riscan-batch.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    let defaults = Config::default();

    assert_eq!(cfg.profile.hres, defaults.profile.hres);
    assert_eq!(cfg.profile.method, defaults.profile.method);
    assert_eq!(cfg.profile.reflectance_threshold, defaults.profile.reflectance_threshold);
    assert_eq!(cfg.voxel.voxelsize, defaults.voxel.voxelsize);
    assert_eq!(cfg.voxel.buffer, defaults.voxel.buffer);
    assert_eq!(cfg.voxel.min_n, defaults.voxel.min_n);
    assert_eq!(cfg.engine.python_exe, defaults.engine.python_exe);
}

#[test]
fn partial_config_falls_back_to_defaults() {
    let cfg: Config = toml::from_str("[profile]\nhres = 0.25\n").expect("parse TOML");
    assert_eq!(cfg.profile.hres, 0.25);
    assert_eq!(cfg.voxel.voxelsize, 1.0);
    assert_eq!(cfg.logging.level, "info");
}
