use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};

/// Mean of the hidden states over unmasked tokens: `[B,T,H]` x `[B,T]` -> `[B,H]`.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    ensure!(dims.len() == 3, "hidden shape must be [B,T,H], got {:?}", dims);
    let hidden_dim = dims[2];

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_broadcast = match mask_3d.broadcast_as(hidden.shape()) {
        Ok(m) => m,
        Err(_) => mask_3d.repeat((1, 1, hidden_dim))?,
    };
    let masked = (hidden * &mask_broadcast)?;
    let sum = masked.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
    Ok(sum.broadcast_div(&lengths)?)
}

/// Row-wise L2 normalization of a `[B,H]` tensor.
pub fn l2_normalize(emb: &Tensor) -> Result<Tensor> {
    let eps_val = match emb.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], emb.device())?.to_dtype(emb.dtype())?.unsqueeze(0)?;
    let norm = emb.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norm = norm.broadcast_add(&eps)?;
    Ok(emb.broadcast_div(&norm)?)
}

/// Sentence embedding for a `[1,T,H]` hidden state: masked mean, then L2
/// normalization when `normalize` is set.
pub fn pool_sentence(hidden: &Tensor, attention_mask: &Tensor, normalize: bool) -> Result<Tensor> {
    if normalize {
        masked_mean_l2(hidden, attention_mask)
    } else {
        masked_mean(hidden, attention_mask)
    }
}

pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let batch = hidden.dims().first().copied().unwrap_or_default();
    let mean = l2_normalize(&masked_mean(hidden, attention_mask)?)?;
    ensure!(mean.dims().first() == Some(&batch), "pooled batch size changed");
    Ok(mean)
}
