use super::*;
use depforge_core::{Requirement, VersionConstraint};
use depforge_resolver::{resolve, schedule, PackageLookup, ResolveError};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_REGISTRY_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[test]
fn package_versions_sorted_highest_first() {
    let root = test_registry_root();
    write_recipe(&root, "zlib", "1.2.13", "");
    write_recipe(&root, "zlib", "1.3.1", "");
    write_recipe(&root, "zlib", "1.3", "");

    let index = RegistryIndex::open(&root);
    let versions: Vec<String> = index
        .package_versions("zlib")
        .expect("must list versions")
        .iter()
        .map(|recipe| recipe.version.to_string())
        .collect();
    assert_eq!(versions, vec!["1.3.1", "1.3.0", "1.2.13"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn package_versions_ignores_non_recipe_files() {
    let root = test_registry_root();
    write_recipe(&root, "glm", "1.0.1", "");
    let package_dir = root.join("index").join("glm");
    fs::write(package_dir.join("README.md"), "notes").expect("must write file");
    fs::create_dir_all(package_dir.join("nested")).expect("must create dir");

    let index = RegistryIndex::open(&root);
    assert_eq!(index.package_versions("glm").expect("versions").len(), 1);
    assert!(index
        .package_versions("missing")
        .expect("versions")
        .is_empty());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn package_versions_rejects_recipe_stored_under_wrong_name() {
    let root = test_registry_root();
    let package_dir = root.join("index").join("libpng");
    fs::create_dir_all(&package_dir).expect("must create package dir");
    fs::write(
        package_dir.join("1.6.43.toml"),
        "name = \"zlib\"\nversion = \"1.6.43\"\n",
    )
    .expect("must write recipe");

    let err = RegistryIndex::open(&root)
        .package_versions("libpng")
        .expect_err("must reject mismatched recipe");
    assert!(err.to_string().contains("stored under 'libpng'"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn package_versions_reports_unparseable_recipe_path() {
    let root = test_registry_root();
    let package_dir = root.join("index").join("spdlog");
    fs::create_dir_all(&package_dir).expect("must create package dir");
    fs::write(package_dir.join("1.14.1.toml"), "name = ").expect("must write recipe");

    let err = RegistryIndex::open(&root)
        .package_versions("spdlog")
        .expect_err("must reject broken recipe");
    assert!(err.to_string().contains("failed parsing recipe"));
    assert!(err.to_string().contains("1.14.1.toml"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn search_names_matches_substring_in_name_order() {
    let root = test_registry_root();
    write_recipe(&root, "freetype", "2.13.2", "");
    write_recipe(&root, "fontconfig", "2.15.0", "");
    write_recipe(&root, "harfbuzz", "11.4.1", "");
    fs::create_dir_all(root.join("index").join("font-empty")).expect("must create dir");

    let index = RegistryIndex::open(&root);
    assert_eq!(
        index.search_names("f").expect("search"),
        vec!["fontconfig", "freetype", "harfbuzz"]
    );
    assert_eq!(index.search_names("font").expect("search"), vec!["fontconfig"]);
    assert!(RegistryIndex::open(root.join("nowhere"))
        .search_names("f")
        .expect("search")
        .is_empty());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn select_highest_compatible_respects_constraint() {
    let root = test_registry_root();
    write_recipe(&root, "tool", "1.2.0", "");
    write_recipe(&root, "tool", "1.3.0", "");
    write_recipe(&root, "tool", "2.0.0", "");

    let recipes = RegistryIndex::open(&root)
        .package_versions("tool")
        .expect("versions");
    let constraint = VersionConstraint::parse("^1.0").expect("constraint");
    let selected = select_highest_compatible(&recipes, &constraint).expect("must select");
    assert_eq!(selected.version.to_string(), "1.3.0");

    let constraint = VersionConstraint::parse("==3.0").expect("constraint");
    assert!(select_highest_compatible(&recipes, &constraint).is_none());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn lookup_derives_build_variables_from_package_info() {
    let root = test_registry_root();
    write_recipe(
        &root,
        "harfbuzz",
        "11.4.1",
        r#"
[requires]
freetype = "any"

[tool_requires]
meson = "^1"

[package_info]
include_dirs = ["include", "include/harfbuzz"]
bin_dirs = []
libs = ["harfbuzz", "harfbuzz-subset"]
defines = ["HB_NO_MT"]

[variables]
lib_dirs = "/custom/lib"
pkg_config_name = "harfbuzz"
"#,
    );

    let mut index = RegistryIndex::open(&root);
    let resolved = index
        .lookup("harfbuzz", &VersionConstraint::Any)
        .expect("must resolve");

    let folder = root.join("packages").join("harfbuzz").join("11.4.1");
    let expected_includes = format!(
        "{};{}",
        folder.join("include").display(),
        folder.join("include/harfbuzz").display()
    );
    assert_eq!(resolved.version, Version::new(11, 4, 1));
    assert_eq!(
        resolved.variables.get("package_folder"),
        Some(&folder.display().to_string())
    );
    assert_eq!(
        resolved.variables.get("include_dirs"),
        Some(&expected_includes)
    );
    assert_eq!(
        resolved.variables.get("lib_dirs").map(String::as_str),
        Some("/custom/lib")
    );
    assert_eq!(resolved.variables.get("bin_dirs"), None);
    assert_eq!(
        resolved.variables.get("libs").map(String::as_str),
        Some("harfbuzz;harfbuzz-subset")
    );
    assert_eq!(
        resolved.variables.get("defines").map(String::as_str),
        Some("HB_NO_MT")
    );
    assert_eq!(
        resolved.variables.get("pkg_config_name").map(String::as_str),
        Some("harfbuzz")
    );
    assert_eq!(
        resolved.requirements,
        vec![
            Requirement::any("freetype"),
            Requirement::tool("meson", VersionConstraint::parse("^1").expect("constraint")),
        ]
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn lookup_reports_missing_package_and_unmatched_version() {
    let root = test_registry_root();
    write_recipe(&root, "glm", "1.0.1", "");
    let mut index = RegistryIndex::open(&root);

    let err = index
        .lookup("cli11", &VersionConstraint::Any)
        .expect_err("must fail");
    assert!(err.to_string().contains("was not found"));

    let err = index
        .lookup("glm", &VersionConstraint::parse("^2").expect("constraint"))
        .expect_err("must fail");
    assert!(err.to_string().contains("no matching version for 'glm'"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn lookup_rejects_recipe_variable_shadowing_version() {
    let root = test_registry_root();
    write_recipe(&root, "zlib", "1.3.1", "[variables]\nversion = \"9.9.9\"\n");
    let mut index = RegistryIndex::open(&root);

    let err = index
        .lookup("zlib", &VersionConstraint::Any)
        .expect_err("must fail");
    assert!(format!("{err:#}").contains("reserved for package metadata"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resolves_and_schedules_from_registry() {
    let root = test_registry_root();
    write_recipe(&root, "zlib", "1.3.1", "");
    write_recipe(
        &root,
        "libpng",
        "1.6.43",
        "[requires]\nzlib = \"[>=1.2 <2]\"\n",
    );
    write_recipe(
        &root,
        "freetype",
        "2.13.2",
        "[requires]\nlibpng = \"any\"\nzlib = \"any\"\n",
    );
    write_recipe(&root, "freetype", "2.12.1", "[requires]\nzlib = \"any\"\n");
    write_recipe(
        &root,
        "harfbuzz",
        "11.4.1",
        "[requires]\nfreetype = \"any\"\n",
    );

    let mut index = RegistryIndex::open(&root);
    let requirements = vec![
        Requirement::parse_reference("freetype/2.13.2").expect("reference"),
        Requirement::parse_reference("harfbuzz/11.4.1").expect("reference"),
    ];
    let graph = resolve(&requirements, &mut index).expect("must resolve graph");
    let plan = schedule(&graph).expect("must schedule");

    let order: Vec<&str> = plan.iter().map(|node| node.name()).collect();
    assert_eq!(order, vec!["zlib", "libpng", "freetype", "harfbuzz"]);
    assert_eq!(plan.batches().len(), 4);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resolve_wraps_registry_errors_as_lookup_failures() {
    let root = test_registry_root();
    write_recipe(&root, "tinygltf", "2.9.0", "[requires]\nnlohmann_json = \"^3\"\n");

    let mut index = RegistryIndex::open(&root);
    let err = resolve(&[Requirement::any("tinygltf")], &mut index).expect_err("must fail");
    match err {
        ResolveError::LookupFailure {
            package,
            requested_by,
            ..
        } => {
            assert_eq!(package, "nlohmann_json");
            assert_eq!(requested_by, "tinygltf");
        }
        other => panic!("unexpected error: {other}"),
    }

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn configured_index_prefers_lower_priority_number() {
    let root = test_registry_root();
    let mirror = root.join("mirror");
    let upstream = root.join("upstream");
    write_recipe(&mirror, "spdlog", "1.13.0", "");
    write_recipe(&upstream, "spdlog", "1.14.1", "");
    write_recipe(&upstream, "fmt", "10.2.1", "");
    fs::write(
        root.join("sources.toml"),
        r#"
version = 1

[[sources]]
name = "upstream"
location = "upstream"
priority = 20

[[sources]]
name = "mirror"
location = "mirror"
priority = 10

[[sources]]
name = "disabled"
location = "upstream"
priority = 0
enabled = false
"#,
    )
    .expect("must write sources");

    let mut configured =
        ConfiguredRegistryIndex::open(&root.join("sources.toml")).expect("must open sources");
    assert_eq!(configured.source_names(), vec!["mirror", "upstream"]);

    let (source, recipes) = configured
        .package_versions_with_source("spdlog")
        .expect("versions")
        .expect("spdlog published");
    assert_eq!(source, "mirror");
    assert_eq!(recipes.len(), 1);

    let resolved = configured
        .lookup("fmt", &VersionConstraint::Any)
        .expect("must resolve fmt");
    assert_eq!(resolved.version, Version::new(10, 2, 1));
    assert!(resolved
        .variables
        .get("package_folder")
        .expect("package folder")
        .contains("upstream"));

    assert_eq!(
        configured.search_names("").expect("search"),
        vec!["fmt", "spdlog"]
    );
    let err = configured
        .lookup("glm", &VersionConstraint::Any)
        .expect_err("must fail");
    assert!(err.to_string().contains("any configured registry source"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn configured_index_breaks_priority_ties_by_name() {
    let root = test_registry_root();
    for name in ["zeta", "alpha", "mid"] {
        write_recipe(&root.join(name), "zlib", "1.3.1", "");
    }
    fs::write(
        root.join("sources.toml"),
        r#"
[[sources]]
name = "zeta"
location = "zeta"
priority = 5

[[sources]]
name = "mid"
location = "mid"
priority = 1

[[sources]]
name = "alpha"
location = "alpha"
priority = 5
"#,
    )
    .expect("must write sources");

    let configured =
        ConfiguredRegistryIndex::open(&root.join("sources.toml")).expect("must open sources");
    assert_eq!(configured.source_names(), vec!["mid", "alpha", "zeta"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn search_names_ignores_case_and_directories_without_recipes() {
    let root = test_registry_root();
    write_recipe(&root, "FreeType", "2.13.2", "");
    write_recipe(&root, "harfbuzz", "11.4.1", "");
    let notes = root.join("index").join("freetype-notes");
    fs::create_dir_all(&notes).expect("must create dir");
    fs::write(notes.join("README.md"), "not a recipe").expect("must write file");

    let index = RegistryIndex::open(&root);
    assert_eq!(index.search_names("FREE").expect("search"), vec!["FreeType"]);
    assert_eq!(index.search_names("BUZZ").expect("search"), vec!["harfbuzz"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn configured_index_skips_missing_source_directories() {
    let root = test_registry_root();
    fs::create_dir_all(&root).expect("must create root");
    fs::write(
        root.join("sources.toml"),
        "[[sources]]\nname = \"gone\"\nlocation = \"gone\"\npriority = 1\n",
    )
    .expect("must write sources");

    let configured =
        ConfiguredRegistryIndex::open(&root.join("sources.toml")).expect("must open sources");
    assert!(configured.source_names().is_empty());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn configured_index_without_sources_file_is_empty() {
    let root = test_registry_root();
    let configured =
        ConfiguredRegistryIndex::open(&root.join("sources.toml")).expect("must open sources");
    assert!(configured.source_names().is_empty());
    assert!(configured
        .package_versions("zlib")
        .expect("versions")
        .is_empty());
}

#[test]
fn configured_index_rejects_invalid_sources() {
    let root = test_registry_root();
    fs::create_dir_all(&root).expect("must create root");
    let path = root.join("sources.toml");

    fs::write(
        &path,
        "[[sources]]\nname = \"Bad Name\"\nlocation = \"x\"\npriority = 1\n",
    )
    .expect("must write sources");
    let err = ConfiguredRegistryIndex::open(&path).expect_err("must reject name");
    assert!(format!("{err:#}").contains("invalid source name"));

    fs::write(
        &path,
        "[[sources]]\nname = \"a\"\nlocation = \"x\"\npriority = 1\n\n[[sources]]\nname = \"a\"\nlocation = \"y\"\npriority = 2\n",
    )
    .expect("must write sources");
    let err = ConfiguredRegistryIndex::open(&path).expect_err("must reject duplicate");
    assert!(format!("{err:#}").contains("duplicate registry source 'a'"));

    fs::write(&path, "version = 7\n").expect("must write sources");
    let err = ConfiguredRegistryIndex::open(&path).expect_err("must reject version");
    assert!(format!("{err:#}").contains("unsupported registry sources version 7"));

    let _ = fs::remove_dir_all(&root);
}

fn write_recipe(root: &Path, name: &str, version: &str, body: &str) {
    let package_dir = root.join("index").join(name);
    fs::create_dir_all(&package_dir).expect("must create package dir");
    let content = format!("name = \"{name}\"\nversion = \"{version}\"\n{body}");
    fs::write(package_dir.join(format!("{version}.toml")), content).expect("must write recipe");
}

fn test_registry_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_REGISTRY_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "depforge-registry-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
