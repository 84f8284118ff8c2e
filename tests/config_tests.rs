use live_photo_painter::config::Configuration;
use live_photo_painter::render::filters::FilterKind;
use live_photo_painter::render::transform::PreRotation;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_full_config() {
    let yaml = r#"
photo-library-paths:
  - "/photos"
  - "/more/photos"
reload-interval: 15m
filters: [toon, smooth-toon]
filter-settings:
  kuwahara-radius: 3
  toon-threshold: 0.3
pre-rotation: 270
rotation: 12.5
offscreen: true
fullscreen: false
random-seed: 7
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(
        cfg.photo_library_paths,
        vec![PathBuf::from("/photos"), PathBuf::from("/more/photos")]
    );
    assert_eq!(cfg.reload_interval, Some(Duration::from_secs(15 * 60)));
    assert_eq!(cfg.filters, vec![FilterKind::Toon, FilterKind::SmoothToon]);
    assert_eq!(cfg.filter_settings.kuwahara_radius, 3);
    assert!((cfg.filter_settings.toon_threshold - 0.3).abs() < f32::EPSILON);
    // untouched settings keep their defaults
    assert!((cfg.filter_settings.toon_quantization_levels - 10.0).abs() < f32::EPSILON);
    assert_eq!(cfg.pre_rotation, PreRotation::ThreeQuarter);
    assert!((cfg.rotation - 12.5).abs() < f32::EPSILON);
    assert!(cfg.offscreen);
    assert!(!cfg.fullscreen);
    assert_eq!(cfg.random_seed, Some(7));
}

#[test]
fn rejects_unknown_filter() {
    let yaml = "photo-library-paths: [/p]\nfilters: [watercolor]\n";
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn rejects_odd_pre_rotation() {
    let yaml = "photo-library-paths: [/p]\npre-rotation: 45\n";
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn rejects_empty_filter_list() {
    let yaml = "photo-library-paths: [/p]\nfilters: []\n";
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "photo-library-paths: [/photos]\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.filters, FilterKind::ALL.to_vec());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = Configuration::from_yaml_file("/no/such/config.yaml").unwrap_err();
    assert!(matches!(err, live_photo_painter::Error::Io(_)));
}
