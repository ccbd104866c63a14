//! Conversion of filled slots into `tch` tensors.
//!
//! Only available with the `torch` feature.

use tch::{Device, Tensor};

use super::slot::{Feed, SlotKey, SlotRef};

impl SlotRef<'_> {
    /// Copies this slot into a tensor of the same shape on `device`.
    ///
    /// Float slots become `Kind::Float`, integer slots `Kind::Int`.
    pub fn to_tensor(&self, device: Device) -> Tensor {
        let shape: Vec<i64> = self.shape().iter().map(|&d| d as i64).collect();
        let flat = match self {
            SlotRef::F32(a) => Tensor::from_slice(&a.iter().copied().collect::<Vec<f32>>()),
            SlotRef::I32(a) => Tensor::from_slice(&a.iter().copied().collect::<Vec<i32>>()),
        };
        flat.reshape(shape.as_slice()).to_device(device)
    }
}

/// Converts every slot of `feed` to a tensor, in key order.
pub fn feed_to_tensors(feed: &Feed<'_>, device: Device) -> Vec<(SlotKey, Tensor)> {
    feed.iter()
        .map(|(key, value)| (*key, value.to_tensor(device)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::pad::pad_description;
    use crate::batch::slot::SlotName;
    use ndarray::Array2;
    use tch::Kind;

    #[test]
    fn float_slot_keeps_shape_and_values() {
        let a = Array2::from_shape_vec((2, 3), vec![0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let t = SlotRef::from(&a).to_tensor(Device::Cpu);
        assert_eq!(t.size(), &[2, 3]);
        assert_eq!(t.kind(), Kind::Float);
        assert_eq!(t.double_value(&[1, 2]), 5.0);
    }

    #[test]
    fn int_slot_becomes_int_tensor() {
        let row = pad_description(&[5, 7], 4).unwrap();
        let t = SlotRef::from(&row).to_tensor(Device::Cpu);
        assert_eq!(t.size(), &[4]);
        assert_eq!(t.kind(), Kind::Int);
        assert_eq!(t.int64_value(&[1]), 7);
        assert_eq!(t.int64_value(&[3]), 0);
    }

    #[test]
    fn feed_converts_every_slot() {
        let a = Array2::<f32>::zeros((2, 2));
        let mut feed = Feed::new();
        feed.insert(SlotKey::shared(SlotName::Mask), SlotRef::from(&a));
        feed.insert(SlotKey::agent(SlotName::Features, 0), SlotRef::from(&a));
        let tensors = feed_to_tensors(&feed, Device::Cpu);
        assert_eq!(tensors.len(), 2);
        assert_eq!(tensors[0].0, SlotKey::agent(SlotName::Features, 0));
    }
}
