use burn::tensor::{Tensor, backend::Backend};

/// A batch of complex matrices `[batch, rows, cols]` stored as two real tensors.
#[derive(Clone, Debug)]
pub struct ComplexTensor<B: Backend> {
    pub re: Tensor<B, 3>,
    pub im: Tensor<B, 3>,
}

impl<B: Backend> ComplexTensor<B> {
    pub fn new(re: Tensor<B, 3>, im: Tensor<B, 3>) -> Self {
        Self { re, im }
    }

    /// Splits `[batch, 2 * rows * cols]` into real parts followed by imaginary parts.
    pub fn from_flat(flat: Tensor<B, 2>, rows: usize, cols: usize) -> Self {
        let [batch, width] = flat.dims();
        debug_assert_eq!(width, 2 * rows * cols);

        let half = rows * cols;
        let re = flat.clone().slice([0..batch, 0..half]).reshape([batch, rows, cols]);
        let im = flat.slice([0..batch, half..2 * half]).reshape([batch, rows, cols]);
        Self { re, im }
    }

    /// Inverse of [`ComplexTensor::from_flat`].
    pub fn flatten(&self) -> Tensor<B, 2> {
        let [batch, rows, cols] = self.re.dims();
        Tensor::cat(
            vec![
                self.re.clone().reshape([batch, rows * cols]),
                self.im.clone().reshape([batch, rows * cols]),
            ],
            1,
        )
    }

    pub fn dims(&self) -> [usize; 3] {
        self.re.dims()
    }

    /// Batched matrix product.
    pub fn matmul(&self, rhs: &Self) -> Self {
        let re = self.re.clone().matmul(rhs.re.clone()) - self.im.clone().matmul(rhs.im.clone());
        let im = self.re.clone().matmul(rhs.im.clone()) + self.im.clone().matmul(rhs.re.clone());
        Self { re, im }
    }

    /// Elementwise squared magnitude.
    pub fn abs_sq(&self) -> Tensor<B, 3> {
        self.re.clone().powf_scalar(2.0) + self.im.clone().powf_scalar(2.0)
    }

    /// Squared Frobenius norm of every matrix in the batch, shape `[batch]`.
    pub fn norm_sq(&self) -> Tensor<B, 1> {
        let [batch, _, _] = self.dims();
        self.abs_sq().reshape([batch as i32, -1]).sum_dim(1).squeeze(1)
    }

    /// Multiplies matrix `b` of the batch by `scale[b]`.
    pub fn scale(&self, scale: Tensor<B, 1>) -> Self {
        let [batch, _, _] = self.dims();
        let scale: Tensor<B, 3> = scale.reshape([batch, 1, 1]);
        Self {
            re: self.re.clone() * scale.clone(),
            im: self.im.clone() * scale,
        }
    }

    /// Scales every matrix to squared Frobenius norm `power`.
    pub fn normalize_power(&self, power: f32, eps: f32) -> Self {
        let scale = self.norm_sq().add_scalar(eps).sqrt().recip().mul_scalar(power.sqrt());
        self.scale(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::TensorData};
    use num_complex::Complex32;

    type B = NdArray<f32>;

    fn from_complex(values: &[Complex32], shape: [usize; 3]) -> ComplexTensor<B> {
        let device = Default::default();
        let re = values.iter().map(|z| z.re).collect::<Vec<_>>();
        let im = values.iter().map(|z| z.im).collect::<Vec<_>>();
        ComplexTensor::new(
            Tensor::from_data(TensorData::new(re, shape), &device),
            Tensor::from_data(TensorData::new(im, shape), &device),
        )
    }

    fn to_complex(z: &ComplexTensor<B>) -> Vec<Complex32> {
        let re = z.re.clone().into_data().to_vec::<f32>().unwrap();
        let im = z.im.clone().into_data().to_vec::<f32>().unwrap();
        re.into_iter()
            .zip(im)
            .map(|(re, im)| Complex32::new(re, im))
            .collect()
    }

    fn c(re: f32, im: f32) -> Complex32 {
        Complex32::new(re, im)
    }

    fn close(a: &[Complex32], b: &[Complex32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).norm() < 1e-4)
    }

    #[test]
    fn matmul_matches_scalar_complex_product() {
        // [[1+i, 2], [0, -i]] x [[1], [1+2i]]
        let lhs = [c(1.0, 1.0), c(2.0, 0.0), c(0.0, 0.0), c(0.0, -1.0)];
        let rhs = [c(1.0, 0.0), c(1.0, 2.0)];

        let product = from_complex(&lhs, [1, 2, 2]).matmul(&from_complex(&rhs, [1, 2, 1]));

        let expected = [
            lhs[0] * rhs[0] + lhs[1] * rhs[1],
            lhs[2] * rhs[0] + lhs[3] * rhs[1],
        ];
        assert_eq!(product.dims(), [1, 2, 1]);
        assert!(close(&to_complex(&product), &expected));
    }

    #[test]
    fn flat_layout_is_real_then_imaginary() {
        let flat = Tensor::<B, 2>::from_data(
            TensorData::new(vec![1.0, 2.0, 3.0, 4.0], [1, 4]),
            &Default::default(),
        );

        let z = ComplexTensor::from_flat(flat.clone(), 2, 1);

        assert!(close(&to_complex(&z), &[c(1.0, 3.0), c(2.0, 4.0)]));
        assert_eq!(
            z.flatten().into_data().to_vec::<f32>().unwrap(),
            flat.into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn normalized_power_is_exact() {
        let values = [c(3.0, 4.0), c(0.0, 0.0), c(1.0, -1.0), c(2.0, 0.5)];
        let z = from_complex(&values, [2, 2, 1]);

        let power = z
            .normalize_power(10.0, 0.0)
            .norm_sq()
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert!(power.iter().all(|p| (p - 10.0).abs() < 1e-4));
    }
}
