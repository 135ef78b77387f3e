#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// One `<object>` of a generated VOC file.
pub struct TestObject<'a> {
    pub name: &'a str,
    pub difficult: bool,
    pub bbox: [f64; 4],
}

pub fn object(name: &str, bbox: [f64; 4]) -> TestObject<'_> {
    TestObject {
        name,
        difficult: false,
        bbox,
    }
}

pub fn difficult(name: &str, bbox: [f64; 4]) -> TestObject<'_> {
    TestObject {
        name,
        difficult: true,
        bbox,
    }
}

pub fn voc_xml(width: u32, height: u32, objects: &[TestObject<'_>]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<annotation>\n");
    xml.push_str(&format!(
        "  <size><width>{width}</width><height>{height}</height><depth>3</depth></size>\n"
    ));
    for obj in objects {
        let [xmin, ymin, xmax, ymax] = obj.bbox;
        xml.push_str(&format!(
            "  <object>\n    <name>{}</name>\n    <difficult>{}</difficult>\n    \
             <bndbox><xmin>{xmin}</xmin><ymin>{ymin}</ymin><xmax>{xmax}</xmax><ymax>{ymax}</ymax></bndbox>\n  </object>\n",
            obj.name,
            u8::from(obj.difficult)
        ));
    }
    xml.push_str("</annotation>\n");
    xml
}

/// Writes `<dir>/<stem>.jpg` (placeholder bytes) and `<dir>/<stem>.xml`.
/// Returns the image path.
pub fn write_sample(
    dir: &Path,
    stem: &str,
    width: u32,
    height: u32,
    objects: &[TestObject<'_>],
) -> PathBuf {
    fs::create_dir_all(dir).expect("create sample dir");
    let image = dir.join(format!("{stem}.jpg"));
    fs::write(&image, b"\xff\xd8\xff\xd9").expect("write image");
    fs::write(dir.join(format!("{stem}.xml")), voc_xml(width, height, objects))
        .expect("write xml");
    image
}

pub fn write_list(path: &Path, items: &[PathBuf]) {
    let mut content = String::new();
    for item in items {
        content.push_str(&item.display().to_string());
        content.push('\n');
    }
    fs::write(path, content).expect("write list");
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read list")
        .lines()
        .map(str::to_string)
        .collect()
}
