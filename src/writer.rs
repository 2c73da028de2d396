//! 聚类结果输出

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::types::ClusterRecord;

pub trait ClusterWriter {
    fn write(&self, clusters: &[ClusterRecord]) -> Result<()>;
}

/// 每个聚类一行，图片名以空格分隔，写入 `clusters.txt`
pub struct TxtWriter {
    path: PathBuf,
}

impl TxtWriter {
    pub const FILE_NAME: &'static str = "clusters.txt";

    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(Self::FILE_NAME) }
    }

    pub fn render(clusters: &[ClusterRecord]) -> String {
        clusters
            .iter()
            .map(|c| c.images.iter().map(|i| i.name.as_str()).collect::<Vec<_>>().join(" ") + "\n")
            .collect()
    }
}

impl ClusterWriter for TxtWriter {
    fn write(&self, clusters: &[ClusterRecord]) -> Result<()> {
        fs::write(&self.path, Self::render(clusters)).map_err(|e| Error::io(&self.path, e))?;
        info!("聚类结果已写入 {}", self.path.display());
        Ok(())
    }
}

/// 以 `<img>` 标签展示每个聚类，聚类之间以 `<hr>` 分隔，写入 `clusters.html`
pub struct HtmlWriter {
    path: PathBuf,
}

impl HtmlWriter {
    pub const FILE_NAME: &'static str = "clusters.html";

    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(Self::FILE_NAME) }
    }

    pub fn render(clusters: &[ClusterRecord]) -> String {
        let body = clusters
            .iter()
            .map(|c| {
                c.images
                    .iter()
                    .map(|i| {
                        let src = escape_html(&i.path.to_string_lossy());
                        format!("<img src=\"{}\" alt=\"{}\">", src, escape_html(&i.name))
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
                    + "\n"
            })
            .collect::<Vec<_>>()
            .join("<hr>\n");
        body + "\n"
    }
}

/// 转义属性值中的 `& < > "`
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl ClusterWriter for HtmlWriter {
    fn write(&self, clusters: &[ClusterRecord]) -> Result<()> {
        fs::write(&self.path, Self::render(clusters)).map_err(|e| Error::io(&self.path, e))?;
        info!("聚类预览已写入 {}", self.path.display());
        Ok(())
    }
}

/// 依次调用多个输出，没有输出目录时不写任何文件
#[derive(Default)]
pub struct CompositeWriter {
    writers: Vec<Box<dyn ClusterWriter>>,
}

impl CompositeWriter {
    /// 创建输出目录，总是输出文本结果，`html` 为 true 时额外输出网页预览
    pub fn new(dir: impl AsRef<Path>, html: bool) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let mut writers: Vec<Box<dyn ClusterWriter>> = vec![Box::new(TxtWriter::new(dir))];
        if html {
            writers.push(Box::new(HtmlWriter::new(dir)));
        }
        Ok(Self { writers })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, writer: Box<dyn ClusterWriter>) {
        self.writers.push(writer);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl ClusterWriter for CompositeWriter {
    fn write(&self, clusters: &[ClusterRecord]) -> Result<()> {
        for writer in &self.writers {
            writer.write(clusters)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;
    use tempfile::tempdir;

    use super::*;
    use crate::types::ImageRecord;

    fn clusters() -> Vec<ClusterRecord> {
        let record = |p: &str| ImageRecord::new(p, Array2::zeros((1, 1)));
        vec![
            ClusterRecord { id: -1, images: vec![record("/d/x.png")] },
            ClusterRecord { id: 0, images: vec![record("/d/a.png"), record("/d/b.png")] },
        ]
    }

    #[test]
    fn test_txt_render() {
        assert_eq!(TxtWriter::render(&clusters()), "x.png\na.png b.png\n");
    }

    #[test]
    fn test_html_render() {
        assert_eq!(
            HtmlWriter::render(&clusters()),
            "<img src=\"/d/x.png\" alt=\"x.png\">\n<hr>\n\
             <img src=\"/d/a.png\" alt=\"a.png\"> <img src=\"/d/b.png\" alt=\"b.png\">\n\n"
        );
    }

    #[test]
    fn test_html_escapes_attributes() {
        let record = ImageRecord::new("/d/a\"b<x>&y.png", Array2::zeros((1, 1)));
        let clusters = vec![ClusterRecord { id: 0, images: vec![record] }];
        assert_eq!(
            HtmlWriter::render(&clusters),
            "<img src=\"/d/a&quot;b&lt;x&gt;&amp;y.png\" alt=\"a&quot;b&lt;x&gt;&amp;y.png\">\n\n"
        );
        assert_eq!(TxtWriter::render(&clusters), "a\"b<x>&y.png\n");
    }

    #[test]
    fn test_composite_creates_dir() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("nested/out");
        let writer = CompositeWriter::new(&out, true).unwrap();
        assert_eq!(writer.len(), 2);
        writer.write(&clusters()).unwrap();
        assert_eq!(fs::read_to_string(out.join("clusters.txt")).unwrap(), "x.png\na.png b.png\n");
        assert!(out.join("clusters.html").exists());
    }

    #[test]
    fn test_composite_without_html() {
        let tmp = tempdir().unwrap();
        CompositeWriter::new(tmp.path(), false).unwrap().write(&clusters()).unwrap();
        assert!(tmp.path().join("clusters.txt").exists());
        assert!(!tmp.path().join("clusters.html").exists());
    }

    #[test]
    fn test_empty_composite_is_noop() {
        let writer = CompositeWriter::empty();
        assert!(writer.is_empty());
        writer.write(&clusters()).unwrap();
    }
}
