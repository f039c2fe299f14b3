use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use svg_app_icon::{Config, IconConfig, Platform, generate};

fn asset(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/assets")
        .join(name)
}

fn config(out: &Path, foreground: &str) -> Config {
    let mut config = Config::new(IconConfig {
        background_path: Some(asset("react-icon-background.svg")),
        foreground_path: asset(foreground),
    });
    config.android_output_path = Some(out.join("android"));
    config.ios_output_path = Some(out.join("ios/AppIcon.appiconset"));
    config
}

async fn run(config: Config) -> Vec<PathBuf> {
    generate(config).try_collect().await.unwrap()
}

fn relative(out: &Path, paths: &[PathBuf]) -> BTreeSet<String> {
    paths
        .iter()
        .map(|path| {
            path.strip_prefix(out)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

fn expected_files(foreground_as_png: bool) -> BTreeSet<String> {
    let densities = ["mdpi", "hdpi", "xhdpi", "xxhdpi", "xxxhdpi"];
    let mut files = BTreeSet::new();

    for density in densities {
        files.insert(format!("android/mipmap-{density}/ic_launcher.png"));
        files.insert(format!("android/mipmap-{density}/ic_launcher_round.png"));
        if foreground_as_png {
            files.insert(format!(
                "android/mipmap-{density}-v26/ic_launcher_foreground.png"
            ));
        }
    }
    files.insert("android/drawable-anydpi-v26/ic_launcher_background.xml".into());
    if !foreground_as_png {
        files.insert("android/drawable-anydpi-v26/ic_launcher_foreground.xml".into());
    }
    files.insert("android/mipmap-anydpi-v26/ic_launcher.xml".into());
    files.insert("android/mipmap-anydpi-v26/ic_launcher_round.xml".into());

    for (idiom, sizes) in [
        ("iphone", &["20@2x", "20@3x", "29@2x", "29@3x", "40@2x", "40@3x", "60@2x", "60@3x"][..]),
        (
            "ipad",
            &["20@1x", "20@2x", "29@1x", "29@2x", "40@1x", "40@2x", "76@1x", "76@2x", "83.5@2x"][..],
        ),
        ("ios-marketing", &["1024@1x"][..]),
    ] {
        for size in sizes {
            files.insert(format!("ios/AppIcon.appiconset/{idiom}-{size}.png"));
        }
    }
    files.insert("ios/AppIcon.appiconset/Contents.json".into());

    files
}

#[tokio::test]
async fn generates_full_icon_set() {
    let out = tempfile::tempdir().unwrap();

    let written = run(config(out.path(), "react-icon.svg")).await;

    assert_eq!(written.len(), 33);
    assert_eq!(relative(out.path(), &written), expected_files(false));

    let legacy = image::open(out.path().join("android/mipmap-xxxhdpi/ic_launcher.png")).unwrap();
    assert_eq!((legacy.width(), legacy.height()), (192, 192));

    let marketing =
        image::open(out.path().join("ios/AppIcon.appiconset/ios-marketing-1024@1x.png")).unwrap();
    assert_eq!((marketing.width(), marketing.height()), (1024, 1024));
    assert_eq!(marketing.color(), image::ColorType::Rgb8);

    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("ios/AppIcon.appiconset/Contents.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["images"].as_array().unwrap().len(), 18);
    assert_eq!(manifest["info"]["author"], "react-native-svg-app-icon");
}

#[tokio::test]
async fn second_run_is_a_no_op_unless_forced() {
    let out = tempfile::tempdir().unwrap();

    let first = run(config(out.path(), "react-icon.svg")).await;
    let second = run(config(out.path(), "react-icon.svg")).await;
    assert!(second.is_empty(), "rewrote {second:?}");

    let mut forced = config(out.path(), "react-icon.svg");
    forced.force = true;
    let forced = run(forced).await;
    assert_eq!(forced, first);
}

#[tokio::test]
async fn text_foreground_falls_back_to_png_layers() {
    let out = tempfile::tempdir().unwrap();

    let written = run(config(out.path(), "text-icon.svg")).await;
    assert_eq!(relative(out.path(), &written), expected_files(true));

    let manifest =
        std::fs::read_to_string(out.path().join("android/mipmap-anydpi-v26/ic_launcher.xml"))
            .unwrap();
    assert!(manifest.contains("@drawable/ic_launcher_background"));
    assert!(manifest.contains("@mipmap/ic_launcher_foreground"));

    let layer =
        image::open(out.path().join("android/mipmap-xxhdpi-v26/ic_launcher_foreground.png"))
            .unwrap();
    assert_eq!((layer.width(), layer.height()), (324, 324));
}

#[tokio::test]
async fn discovers_ios_catalog_by_app_name() {
    let project = tempfile::tempdir().unwrap();
    for app in ["My", "My App"] {
        std::fs::create_dir_all(project.path().join("ios").join(app).join("Images.xcassets"))
            .unwrap();
    }

    let mut config = config(project.path(), "react-icon.svg");
    config.platforms = vec![Platform::Ios];
    config.ios_output_path = None;
    config.app_name = Some("My App".into());
    config.project_dir = project.path().to_path_buf();

    let written = run(config).await;

    assert_eq!(written.len(), 19);
    let catalog = project
        .path()
        .join("ios/My App/Images.xcassets/AppIcon.appiconset");
    assert!(written.iter().all(|path| path.starts_with(&catalog)));
}

#[tokio::test]
async fn default_background_is_used_without_one() {
    let out = tempfile::tempdir().unwrap();
    let mut config = config(out.path(), "react-icon.svg");
    config.icon.background_path = None;
    config.platforms = vec![Platform::Ios];

    run(config).await;

    let icon = image::open(out.path().join("ios/AppIcon.appiconset/ipad-20@1x.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(icon.get_pixel(0, 0).0, [255, 255, 255]);
}
