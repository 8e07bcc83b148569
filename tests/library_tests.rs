//! Tag library behavior seen through expansion: structured entries, filter
//! groups, affixes, nested YAML, catalog, health check and refresh
use prompt_wildcards::{expand, expand_with_seed, ExpandOptions, ResolvedTags, TagLibrary};
use std::fs;
use tempfile::TempDir;

fn library_with(files: &[(&str, &str)]) -> (TempDir, TagLibrary) {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    let library = TagLibrary::new(dir.path());
    (dir, library)
}

const CHARS: &str = r#"
Rin:
  Prompts: ["rin tohsaka, twintails"]
  Prefix: ["masterpiece"]
  Suffix: ["**lowres**"]
  Tags: [female, mage]
Saber:
  Tags: [female, knight]
Archer:
  tags: [male, archer]
"#;

#[test]
fn test_filter_groups_narrow_structured_source() {
    let (_dir, library) = library_with(&[("chars.yaml", CHARS)]);
    for seed in 0..10 {
        let expansion = expand(&library, "<chars:[female][--knight]>", &ExpandOptions::new(seed));
        assert_eq!(expansion.text, "masterpiece, rin tohsaka, twintails");
        assert_eq!(expansion.negative, "lowres");
        assert_eq!(expansion.affixes.prefixes, vec!["masterpiece"]);
        assert_eq!(expansion.affixes.negative_suffixes, vec!["lowres"]);
    }
}

#[test]
fn test_alternation_group() {
    let (_dir, library) = library_with(&[("chars.yaml", CHARS)]);
    for seed in 0..10 {
        let output = expand_with_seed(&library, "<chars:[knight|archer]>", seed);
        assert!(output == "Saber" || output == "Archer", "got {}", output);
    }
}

#[test]
fn test_unscoped_groups_search_every_entry() {
    let (_dir, library) = library_with(&[
        ("chars.yaml", CHARS),
        ("monsters.yaml", "Slime:\n  Tags: [monster]\n"),
    ]);
    assert_eq!(expand_with_seed(&library, "<[monster]>", 1), "Slime");
    assert_eq!(expand_with_seed(&library, "<[male]>", 1), "Archer");
}

#[test]
fn test_variable_filter_group() {
    let (_dir, library) = library_with(&[("chars.yaml", CHARS)]);
    assert_eq!(expand_with_seed(&library, "$role=archer <chars:[$role]>", 2), "Archer");
}

#[test]
fn test_no_matching_entry_is_empty() {
    let (_dir, library) = library_with(&[("chars.yaml", CHARS)]);
    assert_eq!(expand_with_seed(&library, "a <chars:[dragon]> b", 1), "a b");
}

#[test]
fn test_structured_title_path() {
    let (_dir, library) = library_with(&[("chars.yaml", CHARS)]);
    assert_eq!(
        expand_with_seed(&library, "__chars/rin__", 1),
        "masterpiece, rin tohsaka, twintails"
    );
    assert_eq!(expand_with_seed(&library, "__chars/saber__", 1), "Saber");
}

#[test]
fn test_structured_without_groups_visits_all_titles() {
    let (_dir, library) = library_with(&[("chars.yaml", "A:\n  Tags: [x]\nB:\n  Tags: [x]\n")]);
    for seed in 0..10 {
        let output = expand_with_seed(&library, "__chars__ __chars__", seed);
        assert!(output == "A B" || output == "B A", "got {}", output);
    }
}

#[test]
fn test_flat_nested_yaml_paths() {
    let content = "cats: [tabby, siamese]\ndogs:\n  small: [pug]\n  large: [mastiff]\n";
    let (_dir, library) = library_with(&[("animals.yaml", content)]);
    assert_eq!(expand_with_seed(&library, "__animals/dogs/small__", 1), "pug");
    assert_eq!(expand_with_seed(&library, "__ANIMALS/Dogs/Large__", 1), "mastiff");
    for seed in 0..10 {
        let output = expand_with_seed(&library, "__animals/dogs__", seed);
        assert!(output == "pug" || output == "mastiff");
    }
}

#[test]
fn test_subdirectory_files_resolve_by_path_and_basename() {
    let (_dir, library) = library_with(&[("styles/lighting.txt", "rim light\n")]);
    assert_eq!(expand_with_seed(&library, "__styles/lighting__", 1), "rim light");
    assert_eq!(expand_with_seed(&library, "__lighting__", 1), "rim light");
}

#[test]
fn test_broken_source_is_skipped() {
    let (_dir, library) = library_with(&[
        ("broken.yaml", "a: [unclosed\n"),
        ("colors.txt", "red\n"),
    ]);
    assert_eq!(expand_with_seed(&library, "__broken__ __colors__", 1), "red");

    let issues = library.check();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].path.ends_with("broken.yaml"));
    assert!(issues[0].content.contains("unclosed"));
}

#[test]
fn test_catalog_lists_files_and_tags() {
    let (_dir, library) = library_with(&[
        ("chars.yaml", CHARS),
        ("colors.txt", "red\n"),
        ("globals.yaml", "style: anime\n"),
        ("sub/poses.csv", "pose\nsitting\n"),
    ]);
    let catalog = library.catalog();
    assert_eq!(catalog.files, vec!["chars", "colors", "sub/poses"]);
    assert_eq!(catalog.tags, vec!["archer", "female", "knight", "mage", "male"]);
}

#[test]
fn test_refresh_picks_up_changes() {
    let (dir, library) = library_with(&[("colors.txt", "red\n")]);
    assert_eq!(expand_with_seed(&library, "__colors__", 1), "red");

    fs::write(dir.path().join("colors.txt"), "blue\n").unwrap();
    assert_eq!(expand_with_seed(&library, "__colors__", 1), "red");

    let options = ExpandOptions::new(1).with_refresh(true);
    assert_eq!(expand(&library, "__colors__", &options).text, "blue");
}

#[test]
fn test_resolve_and_glob() {
    let (_dir, library) = library_with(&[("chars.yaml", CHARS), ("colors.txt", "red\nblue\n")]);
    assert_eq!(
        library.resolve("Colors"),
        ResolvedTags::List(vec!["red".to_string(), "blue".to_string()])
    );
    assert_eq!(library.resolve("nothing"), ResolvedTags::List(Vec::new()));
    assert_eq!(library.glob("chars/*"), vec!["chars/archer", "chars/rin", "chars/saber"]);
    assert!(library.entry_details("Rin").is_some());
}
