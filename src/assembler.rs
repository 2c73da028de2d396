use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::pipeline::Stage;
use crate::progress::ProgressSink;
use crate::types::{ClusterRecord, ImageRecord, Label};

/// 图片及其对应的聚类标签
#[derive(Debug, Clone, Copy)]
pub struct LabeledImages<'a> {
    pub images: &'a [ImageRecord],
    pub labels: &'a [Label],
}

/// 按标签升序排列的分组，每组为图片序号列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterLayout {
    pub groups: Vec<(Label, Vec<usize>)>,
}

impl ClusterLayout {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// 按标签将图片分组
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterAssembler;

impl ClusterAssembler {
    /// 分组结果按标签升序（离群点 -1 在最前），组内保持输入顺序，每张图片恰好出现一次
    pub fn assemble(
        &self,
        images: &[ImageRecord],
        labels: &[Label],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ClusterRecord>> {
        let (_, clusters) = self.fit_transform(&LabeledImages { images, labels }, progress)?;
        Ok(clusters)
    }
}

impl<'a> Stage<LabeledImages<'a>> for ClusterAssembler {
    type Fitted = ClusterLayout;
    type Output = Vec<ClusterRecord>;

    fn fit(&self, input: &LabeledImages<'a>, progress: &dyn ProgressSink) -> Result<ClusterLayout> {
        if input.images.len() != input.labels.len() {
            return Err(Error::invalid_input(
                "assemble",
                format!("图片有 {} 张，标签有 {} 个", input.images.len(), input.labels.len()),
            ));
        }

        progress.begin("归类", input.labels.len());
        let mut groups: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
        for (i, &label) in input.labels.iter().enumerate() {
            groups.entry(label).or_default().push(i);
            progress.advance();
        }
        progress.finish("归类完成");

        Ok(ClusterLayout { groups: groups.into_iter().collect() })
    }

    fn transform(
        &self,
        layout: &ClusterLayout,
        input: &LabeledImages<'a>,
        _progress: &dyn ProgressSink,
    ) -> Result<Vec<ClusterRecord>> {
        let total: usize = layout.groups.iter().map(|(_, idx)| idx.len()).sum();
        if total != input.images.len() {
            return Err(Error::invalid_input(
                "assemble",
                format!("分组包含 {} 张图片，输入有 {} 张", total, input.images.len()),
            ));
        }

        layout
            .groups
            .iter()
            .map(|(label, indices)| {
                let images = indices
                    .iter()
                    .map(|&i| {
                        let mut image = input
                            .images
                            .get(i)
                            .ok_or_else(|| {
                                Error::invalid_input("assemble", format!("图片序号 {i} 越界"))
                            })?
                            .clone();
                        image.cluster = Some(*label);
                        Ok(image)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ClusterRecord { id: *label, images })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use ndarray::Array2;

    use super::*;
    use crate::progress::NoProgress;
    use crate::types::NOISE;

    fn images(n: usize) -> Vec<ImageRecord> {
        (0..n).map(|i| ImageRecord::new(format!("/img/{i}.png"), Array2::zeros((1, 1)))).collect()
    }

    #[test]
    fn test_assemble_orders_by_label() {
        let images = images(6);
        let labels = [2, 0, NOISE, 2, 0, 5];
        let clusters = ClusterAssembler.assemble(&images, &labels, &NoProgress).unwrap();

        let ids = clusters.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![NOISE, 0, 2, 5]);
        assert!(clusters[0].is_noise());

        let names = |c: &ClusterRecord| c.images.iter().map(|i| i.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&clusters[1]), vec!["1.png", "4.png"]);
        assert_eq!(names(&clusters[2]), vec!["0.png", "3.png"]);
        for cluster in &clusters {
            assert!(cluster.images.iter().all(|i| i.cluster == Some(cluster.id)));
        }
    }

    #[test]
    fn test_assemble_is_partition() {
        let images = images(50);
        let labels = (0..50).map(|i| ((i * 7) % 5) as Label - 1).collect::<Vec<_>>();
        let clusters = ClusterAssembler.assemble(&images, &labels, &NoProgress).unwrap();

        let all = clusters.iter().flat_map(|c| c.images.iter().map(|i| i.path.clone())).collect::<Vec<_>>();
        let unique = all.iter().cloned().collect::<HashSet<_>>();
        assert_eq!(all.len(), 50);
        assert_eq!(unique, images.iter().map(|i| i.path.clone()).collect::<HashSet<_>>());
    }

    #[test]
    fn test_reassemble_replaces_groups() {
        let images = images(4);
        let first = ClusterAssembler.assemble(&images, &[0, 0, 1, 1], &NoProgress).unwrap();
        let second = ClusterAssembler.assemble(&images, &[0, 1, 0, 1], &NoProgress).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].images.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(), ["0.png", "2.png"]);
    }

    #[test]
    fn test_assemble_length_mismatch() {
        let images = images(3);
        let err = ClusterAssembler.assemble(&images, &[0, 1], &NoProgress).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { stage: "assemble", .. }));
    }
}
