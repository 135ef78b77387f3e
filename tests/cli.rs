use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

mod common;
use common::{difficult, object, read_lines, write_list, write_sample};

fn vocprep() -> Command {
    let mut cmd = Command::cargo_bin("vocprep").unwrap();
    cmd.env_remove("VOCPREP_CATEGORIES");
    cmd
}

#[test]
fn runs() {
    vocprep().assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = vocprep();
    cmd.arg("-V");
    cmd.assert().success().stdout("vocprep 0.1.0\n");
}

// check-files

#[test]
fn check_files_reports_one_missing_of_three() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let a = temp.path().join("a.jpg");
    let b = temp.path().join("b.jpg");
    let gone = temp.path().join("gone.jpg");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "b").unwrap();
    let list = temp.path().join("list.txt");
    write_list(&list, &[a, gone.clone(), b]);

    let output = vocprep()
        .args(["check-files", "-i"])
        .arg(&list)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    assert_eq!(stdout.matches("does not exist").count(), 1);
    assert!(stdout.contains(&format!("{} does not exist", gone.display())));
    assert!(stdout.contains("there're 1 files missing"));
}

#[test]
fn check_files_all_present() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let a = temp.path().join("a.jpg");
    fs::write(&a, "a").unwrap();
    let list = temp.path().join("list.txt");
    write_list(&list, &[a]);

    vocprep()
        .args(["check-files", "--input-list"])
        .arg(&list)
        .assert()
        .success()
        .stdout("all files are there\n");
}

#[test]
fn check_files_missing_list_fails() {
    vocprep()
        .args(["check-files", "-i", "no/such/list.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("does not exist"));
}

// label-files

#[test]
fn label_files_writes_map_and_list() {
    let data = tempfile::tempdir().expect("create data dir");
    let out = tempfile::tempdir().expect("create output dir");
    fs::create_dir(data.path().join("person")).unwrap();
    fs::create_dir(data.path().join("car")).unwrap();

    vocprep()
        .args(["label-files", "-d"])
        .arg(data.path())
        .arg("-o")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 categories"));

    assert_eq!(read_lines(&out.path().join("label_list.txt")), ["car", "person"]);
    let map = fs::read_to_string(out.path().join("label_map.txt")).unwrap();
    assert!(map.contains("id: 2\n    name: 'person'"));
}

#[test]
fn label_files_missing_output_dir_fails() {
    let data = tempfile::tempdir().expect("create data dir");
    vocprep()
        .args(["label-files", "-d"])
        .arg(data.path())
        .arg("-o")
        .arg(data.path().join("missing"))
        .assert()
        .failure();
}

// split

#[test]
fn split_writes_four_counted_lists() {
    let data = tempfile::tempdir().expect("create data dir");
    let out = tempfile::tempdir().expect("create output dir");
    for i in 0..10 {
        write_sample(&data.path().join("cat"), &format!("cat_{i}"), 64, 64, &[]);
    }
    for i in 0..20 {
        write_sample(&data.path().join("dog"), &format!("dog_{i}"), 64, 64, &[]);
    }

    vocprep()
        .args(["split", "-d"])
        .arg(data.path())
        .args(["-r", "0.1", "--seed", "7", "--output-dir"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("27 training pairs"))
        .stdout(predicate::str::contains("3 validation pairs"));

    let train_xml = read_lines(&out.path().join("train_xml_paths_27.txt"));
    let train_images = read_lines(&out.path().join("train_image_paths_27.txt"));
    let val_xml = read_lines(&out.path().join("val_xml_paths_3.txt"));
    assert!(out.path().join("val_image_paths_3.txt").is_file());

    assert_eq!(train_xml.len(), 27);
    assert_eq!(val_xml.len(), 3);
    for (xml, image) in train_xml.iter().zip(&train_images) {
        assert_eq!(xml.trim_end_matches(".xml"), image.trim_end_matches(".jpg"));
    }
}

#[test]
fn split_rejects_ratio_above_one() {
    let data = tempfile::tempdir().expect("create data dir");
    vocprep()
        .args(["split", "-d"])
        .arg(data.path())
        .args(["-r", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ratio"));
}

#[test]
fn split_ignores_missing_enhanced_dir() {
    let data = tempfile::tempdir().expect("create data dir");
    write_sample(&data.path().join("cat"), "cat_1", 64, 64, &[]);

    vocprep()
        .args(["split", "-d"])
        .arg(data.path())
        .arg("-e")
        .arg(data.path().join("no-enhanced"))
        .arg("--output-dir")
        .arg(data.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("ignore it"));
}

// coco-annotations

#[test]
fn coco_annotations_writes_document() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let images = vec![
        write_sample(
            &temp.path().join("cat"),
            "cat_3",
            100,
            100,
            &[object("Cat", [10.0, 20.0, 50.0, 60.0]), difficult("cat", [0.0, 0.0, 9.0, 9.0])],
        ),
        write_sample(
            &temp.path().join("dog"),
            "dog_4",
            200,
            100,
            &[object("dog", [0.0, 0.0, 100.0, 50.0])],
        ),
    ];
    let list = temp.path().join("val.txt");
    write_list(&list, &images);
    let categories = temp.path().join("categories.txt");
    fs::write(&categories, "cat\ndog\n").unwrap();
    let output = temp.path().join("annotations.json");

    vocprep()
        .args(["coco-annotations", "-i"])
        .arg(&list)
        .arg("-c")
        .arg(&categories)
        .arg("-o")
        .arg(&output)
        .args(["--description", "pets", "--year", "2018"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Aggregated 2 images with 2 annotations"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["info"]["description"], "pets");
    assert_eq!(json["images"][0]["id"], 3);
    assert_eq!(json["annotations"][0]["bbox"], serde_json::json!([10.0, 20.0, 40.0, 40.0]));
    assert_eq!(json["annotations"][1]["category_id"], 2);
    assert_eq!(json["categories"][1]["supercategory"], "dog");
}

#[test]
fn coco_annotations_reads_categories_from_env() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let image = write_sample(temp.path(), "cat_1", 100, 100, &[object("cat", [1.0, 1.0, 50.0, 50.0])]);
    let list = temp.path().join("list.txt");
    write_list(&list, &[image]);
    let categories = temp.path().join("categories.txt");
    fs::write(&categories, "cat\n").unwrap();

    vocprep()
        .env("VOCPREP_CATEGORIES", &categories)
        .args(["coco-annotations", "-i"])
        .arg(&list)
        .arg("-o")
        .arg(temp.path().join("out.json"))
        .assert()
        .success();
    assert!(temp.path().join("out.json").is_file());
}

#[test]
fn coco_annotations_bad_image_id_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let image = write_sample(temp.path(), "cat", 100, 100, &[]);
    let list = temp.path().join("list.txt");
    write_list(&list, &[image]);
    let categories = temp.path().join("categories.txt");
    fs::write(&categories, "cat\n").unwrap();

    vocprep()
        .args(["coco-annotations", "-i"])
        .arg(&list)
        .arg("-c")
        .arg(&categories)
        .arg("-o")
        .arg(temp.path().join("out.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("image id"));
}

#[test]
fn coco_annotations_duplicate_image_id_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let objects = [object("cat", [1.0, 1.0, 50.0, 50.0])];
    let images = vec![
        write_sample(&temp.path().join("cat"), "cat_1", 100, 100, &objects),
        write_sample(&temp.path().join("dog"), "dog_1", 100, 100, &objects),
    ];
    let list = temp.path().join("list.txt");
    write_list(&list, &images);
    let categories = temp.path().join("categories.txt");
    fs::write(&categories, "cat\ndog\n").unwrap();
    let output = temp.path().join("out.json");

    vocprep()
        .args(["coco-annotations", "-i"])
        .arg(&list)
        .arg("-c")
        .arg(&categories)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Image id 1 is used by both"));
    assert!(!output.exists());
}

// yolo-preprocess

#[test]
fn yolo_preprocess_requires_a_set() {
    let temp = tempfile::tempdir().expect("create temp dir");
    fs::create_dir(temp.path().join("images")).unwrap();
    let categories = temp.path().join("categories.txt");
    fs::write(&categories, "cat\n").unwrap();

    vocprep()
        .args(["yolo-preprocess", "-d"])
        .arg(temp.path())
        .arg("-c")
        .arg(&categories)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--train-set"));
}

#[test]
fn yolo_preprocess_writes_labels_and_manifests() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let images_dir = temp.path().join("images/cat");
    let train = vec![
        write_sample(&images_dir, "cat.jpg_1", 100, 100, &[object("cat", [10.0, 20.0, 50.0, 60.0])]),
        write_sample(&images_dir, "cat_2", 0, 0, &[object("cat", [10.0, 20.0, 50.0, 60.0])]),
    ];
    let val = vec![write_sample(
        &images_dir,
        "cat_3",
        100,
        100,
        &[object("cat", [10.0, 20.0, 50.0, 60.0])],
    )];
    let train_list = temp.path().join("train.txt");
    let val_list = temp.path().join("val.txt");
    write_list(&train_list, &train);
    write_list(&val_list, &val);
    let categories = temp.path().join("categories.txt");
    fs::write(&categories, "cat\n").unwrap();

    // Stale labels are wiped.
    fs::create_dir_all(temp.path().join("labels/old")).unwrap();

    vocprep()
        .args(["yolo-preprocess", "-d"])
        .arg(temp.path())
        .arg("-c")
        .arg(&categories)
        .arg("-t")
        .arg(&train_list)
        .arg("-v")
        .arg(&val_list)
        .assert()
        .success()
        .stdout(predicate::str::contains("train set"))
        .stdout(predicate::str::contains("1 of 2 images labeled"));

    assert!(!temp.path().join("labels/old").exists());
    assert!(images_dir.join("catjpg_1.jpg").is_file());
    assert!(images_dir.join("cat_3_1.jpg").is_file());
    assert_eq!(
        fs::read_to_string(temp.path().join("labels/cat/catjpg_1.txt")).unwrap(),
        "0 0.290000 0.390000 0.400000 0.400000\n"
    );
    assert!(temp.path().join("labels/cat/cat_3_1.txt").is_file());

    assert_eq!(
        read_lines(&temp.path().join("train_yolo_1.txt")),
        [images_dir.join("catjpg_1.jpg").display().to_string()]
    );
    assert_eq!(
        read_lines(&temp.path().join("val_yolo_1.xml")),
        [images_dir.join("cat_3_1.xml").display().to_string()]
    );
}

// fix-results

#[test]
fn fix_results_default_output() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let input = temp.path().join("results.json");
    fs::write(
        &input,
        r#"[{"image_id": 1, "category_id": 13, "bbox": [1, 2, 3, 4], "score": 0.5},
            {"image_id": 2, "category_id": 90, "bbox": [1, 2, 3, 4], "score": 0.25}]"#,
    )
    .unwrap();

    vocprep()
        .args(["fix-results", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Remapped 2 detections"));

    let fixed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("results_fixed.json")).unwrap())
            .unwrap();
    assert_eq!(fixed[0]["category_id"], 12);
    assert_eq!(fixed[1]["category_id"], 80);
}

#[test]
fn fix_results_unknown_id_fails_without_output() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let input = temp.path().join("results.json");
    fs::write(&input, r#"[{"image_id": 1, "category_id": 12, "score": 0.5}]"#).unwrap();
    let output = temp.path().join("out.json");

    vocprep()
        .args(["fix-results", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Category id 12"));
    assert!(!output.exists());
}

#[test]
fn fix_results_custom_id_list() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let input = temp.path().join("results.json");
    fs::write(&input, r#"[{"image_id": 1, "category_id": 42}]"#).unwrap();
    let ids = temp.path().join("ids.txt");
    fs::write(&ids, "7\n42\n").unwrap();

    vocprep()
        .args(["fix-results", "-i"])
        .arg(&input)
        .arg("--id-list")
        .arg(&ids)
        .assert()
        .success();

    let fixed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("results_fixed.json")).unwrap())
            .unwrap();
    assert_eq!(fixed[0]["category_id"], 2);
}

// evaluate

const GROUND_TRUTH: &str = r#"{
    "images": [{"id": 1, "file_name": "a.jpg", "width": 640, "height": 480}],
    "categories": [{"id": 1, "name": "cat"}],
    "annotations": [
        {"id": 1, "image_id": 1, "category_id": 1, "bbox": [10, 10, 100, 100], "area": 10000, "iscrowd": 0}
    ]
}"#;

#[test]
fn evaluate_prints_twelve_lines() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let gt = temp.path().join("gt.json");
    let dt = temp.path().join("dt.json");
    fs::write(&gt, GROUND_TRUTH).unwrap();
    fs::write(
        &dt,
        r#"[{"image_id": 1, "category_id": 1, "bbox": [10, 10, 100, 100], "score": 0.9}]"#,
    )
    .unwrap();

    let output = vocprep()
        .args(["evaluate", "-a"])
        .arg(&gt)
        .arg("-r")
        .arg(&dt)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    assert_eq!(stdout.matches(" @[ IoU=").count(), 12);
    assert!(stdout.contains(
        " Average Precision  (AP) @[ IoU=0.50:0.95 | area=   all | maxDets=100 ] = 1.000"
    ));
    assert!(stdout.contains(
        " Average Precision  (AP) @[ IoU=0.50:0.95 | area= small | maxDets=100 ] = -1.000"
    ));
}

#[test]
fn evaluate_json_output() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let gt = temp.path().join("gt.json");
    let dt = temp.path().join("dt.json");
    fs::write(&gt, GROUND_TRUTH).unwrap();
    fs::write(&dt, "[]").unwrap();

    let output = vocprep()
        .args(["evaluate", "-a"])
        .arg(&gt)
        .arg("-r")
        .arg(&dt)
        .args(["--output", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["stats"].as_array().unwrap().len(), 12);
    assert_eq!(json["stats"][0]["value"], 0.0);
}

#[test]
fn evaluate_rejects_unknown_images() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let gt = temp.path().join("gt.json");
    let dt = temp.path().join("dt.json");
    fs::write(&gt, GROUND_TRUTH).unwrap();
    fs::write(
        &dt,
        r#"[{"image_id": 9, "category_id": 1, "bbox": [10, 10, 100, 100], "score": 0.9}]"#,
    )
    .unwrap();

    vocprep()
        .args(["evaluate", "-a"])
        .arg(&gt)
        .arg("-r")
        .arg(&dt)
        .assert()
        .failure()
        .stderr(predicate::str::contains("do not correspond"));
}
