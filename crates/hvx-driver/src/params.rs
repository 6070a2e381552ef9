// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Argument decoding for windowed operations.
//!
//! Pooling and convolution operations come in two forms: an implicit one
//! carrying a padding code, and an explicit one carrying four padding
//! amounts. Both decode into a [`Window2d`].
//!
//! | Operation | Explicit | Implicit |
//! |-----------|----------|----------|
//! | pooling   | 10 inputs: in, pad l/r/t/b, stride w/h, filter w/h, act | 7 inputs: in, code, stride w/h, filter w/h, act |
//! | conv      | 10 inputs: in, filter, bias, pad l/r/t/b, stride w/h, act | 7 inputs: in, filter, bias, code, stride w/h, act |
//! | depthwise | 11 inputs: conv explicit + multiplier before act | 8 inputs: conv implicit + multiplier before act |

use hexagon_link::PaddingMode;
use nn_model::{FusedActivation, Operation};
use tensor_shape::{ExplicitPadding, Padding2d, Shape, Window2d};

use crate::catalog::{scheme_mode, OperandCatalog};
use crate::LoweringError;

/// Decoded pooling arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolParams {
    pub input: u32,
    pub window: Window2d,
    pub activation: FusedActivation,
}

/// Decoded convolution arguments. `multiplier` is 1 for plain convolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvParams {
    pub input: u32,
    pub filter: u32,
    pub bias: u32,
    pub window: Window2d,
    pub multiplier: u32,
    pub activation: FusedActivation,
}

pub(crate) fn expect_counts(
    op: &Operation,
    inputs: &[usize],
    outputs: usize,
) -> Result<(), LoweringError> {
    if !inputs.contains(&op.inputs.len()) || op.outputs.len() != outputs {
        return Err(LoweringError::Validation(format!(
            "{} takes {inputs:?} inputs and {outputs} outputs, got {} and {}",
            op.kind,
            op.inputs.len(),
            op.outputs.len()
        )));
    }
    Ok(())
}

fn non_negative(catalog: &OperandCatalog, index: u32, name: &str) -> Result<u32, LoweringError> {
    let value = catalog.scalar::<i32>(index)?;
    u32::try_from(value).map_err(|_| {
        LoweringError::Validation(format!("{name} must not be negative, got {value}"))
    })
}

fn positive(catalog: &OperandCatalog, index: u32, name: &str) -> Result<u32, LoweringError> {
    match non_negative(catalog, index, name)? {
        0 => Err(LoweringError::Validation(format!("{name} must be positive"))),
        v => Ok(v),
    }
}

/// Left, right, top and bottom padding from four operation inputs.
fn explicit_padding(catalog: &OperandCatalog, args: &[u32]) -> Result<Padding2d, LoweringError> {
    let [left, right, top, bottom] = args else {
        return Err(LoweringError::Validation(format!(
            "explicit padding takes 4 operands, got {}",
            args.len()
        )));
    };
    Ok(Padding2d::Explicit(ExplicitPadding::new(
        non_negative(catalog, *left, "padding left")?,
        non_negative(catalog, *right, "padding right")?,
        non_negative(catalog, *top, "padding top")?,
        non_negative(catalog, *bottom, "padding bottom")?,
    )))
}

/// Window depth `2 * radius + 1` of a LOCAL_RESPONSE_NORMALIZATION.
pub fn lrn_window(catalog: &OperandCatalog, radius: u32) -> Result<u32, LoweringError> {
    let value = non_negative(catalog, radius, "LRN radius")?;
    value
        .checked_mul(2)
        .and_then(|v| v.checked_add(1))
        .ok_or_else(|| LoweringError::Validation(format!("LRN radius {value} is too large")))
}

/// Decodes AVERAGE_POOL_2D / MAX_POOL_2D / L2_POOL_2D arguments.
pub fn pool_params(catalog: &OperandCatalog, op: &Operation) -> Result<PoolParams, LoweringError> {
    expect_counts(op, &[10, 7], 1)?;
    let i = &op.inputs;
    let (padding, rest) = if i.len() == 10 {
        (explicit_padding(catalog, &i[1..5])?, &i[5..])
    } else {
        (Padding2d::Implicit(catalog.padding_scheme(i[1])?), &i[2..])
    };
    Ok(PoolParams {
        input: i[0],
        window: Window2d {
            stride_width: positive(catalog, rest[0], "stride width")?,
            stride_height: positive(catalog, rest[1], "stride height")?,
            filter_width: positive(catalog, rest[2], "filter width")?,
            filter_height: positive(catalog, rest[3], "filter height")?,
            padding,
        },
        activation: catalog.activation(rest[4])?,
    })
}

fn conv_common(
    catalog: &OperandCatalog,
    op: &Operation,
    explicit_len: usize,
    with_multiplier: bool,
) -> Result<ConvParams, LoweringError> {
    let i = &op.inputs;
    let (padding, rest) = if i.len() == explicit_len {
        (explicit_padding(catalog, &i[3..7])?, &i[7..])
    } else {
        (Padding2d::Implicit(catalog.padding_scheme(i[3])?), &i[4..])
    };
    let filter = catalog.shape(i[1])?;
    if filter.rank() != 4 {
        return Err(LoweringError::Validation(format!(
            "{}: filter must have rank 4, has {}",
            op.kind,
            filter.rank()
        )));
    }
    let (multiplier, act) = if with_multiplier {
        (positive(catalog, rest[2], "depth multiplier")?, rest[3])
    } else {
        (1, rest[2])
    };
    Ok(ConvParams {
        input: i[0],
        filter: i[1],
        bias: i[2],
        window: Window2d {
            filter_height: filter.dims[1],
            filter_width: filter.dims[2],
            stride_width: positive(catalog, rest[0], "stride width")?,
            stride_height: positive(catalog, rest[1], "stride height")?,
            padding,
        },
        multiplier,
        activation: catalog.activation(act)?,
    })
}

/// Decodes CONV_2D arguments.
pub fn conv_params(catalog: &OperandCatalog, op: &Operation) -> Result<ConvParams, LoweringError> {
    expect_counts(op, &[10, 7], 1)?;
    conv_common(catalog, op, 10, false)
}

/// Decodes DEPTHWISE_CONV_2D arguments.
pub fn depthwise_params(
    catalog: &OperandCatalog,
    op: &Operation,
) -> Result<ConvParams, LoweringError> {
    expect_counts(op, &[11, 8], 1)?;
    conv_common(catalog, op, 11, true)
}

/// Accelerator padding mode of a window applied to `input`.
///
/// Explicit padding must reconcile to an implicit scheme.
pub fn padding_mode(
    op: &'static str,
    window: &Window2d,
    input: &Shape,
) -> Result<PaddingMode, LoweringError> {
    let (h, w) = match input.dims[..] {
        [_, h, w, _] => (h, w),
        _ => {
            return Err(LoweringError::Validation(format!(
                "{op}: input must have rank 4, has {}",
                input.rank()
            )))
        }
    };
    match window.scheme(h, w) {
        Some(scheme) => Ok(scheme_mode(scheme)),
        None => {
            let padding = match window.padding {
                Padding2d::Explicit(p) => p,
                Padding2d::Implicit(_) => ExplicitPadding::default(),
            };
            Err(LoweringError::UnknownPadding { op, padding })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexagon_link::RecordingLink;
    use nn_model::{ModelDescription, Operand, OperationKind};
    use std::sync::Arc;
    use tensor_shape::{OperandType, PaddingScheme};

    fn pool_model(args: &[i32]) -> (OperandCatalog, Operation) {
        let mut model = ModelDescription::new("pool");
        let input = model.add_operand(
            Operand::new(OperandType::TensorQuant8Asymm, vec![1, 7, 7, 3]).with_quantization(1.0, 0),
        );
        let output = model.add_operand(
            Operand::new(OperandType::TensorQuant8Asymm, vec![0, 0, 0, 0]).with_quantization(1.0, 0),
        );
        let mut inputs = vec![input];
        inputs.extend(args.iter().map(|&v| model.add_i32(v)));
        let op = Operation::new(OperationKind::MaxPool2d, inputs, vec![output]);
        model.add_operation(op.clone());
        model.identify_inputs_and_outputs(vec![input], vec![output]);
        let model = model.validate().unwrap();
        let catalog = OperandCatalog::new(&model, Arc::new(RecordingLink::new())).unwrap();
        (catalog, op)
    }

    #[test]
    fn test_explicit_pool_form() {
        let (catalog, op) = pool_model(&[0, 1, 0, 1, 2, 2, 3, 3, 0]);
        let p = pool_params(&catalog, &op).unwrap();
        assert_eq!(p.window.padding, Padding2d::Explicit(ExplicitPadding::new(0, 1, 0, 1)));
        assert_eq!((p.window.stride_width, p.window.filter_height), (2, 3));
        assert_eq!(p.activation, FusedActivation::None);
        let input = catalog.shape(p.input).unwrap();
        assert_eq!(padding_mode("pool", &p.window, &input).unwrap(), PaddingMode::Same);
    }

    #[test]
    fn test_explicit_padding_with_shared_scalars() {
        let mut model = ModelDescription::new("pool");
        let q8 = |dims| {
            Operand::new(OperandType::TensorQuant8Asymm, dims).with_quantization(1.0, 0)
        };
        let input = model.add_operand(q8(vec![1, 7, 7, 3]));
        let output = model.add_operand(q8(vec![0, 0, 0, 0]));
        let zero = model.add_i32(0);
        let one = model.add_i32(1);
        let two = model.add_i32(2);
        let three = model.add_i32(3);
        let op = Operation::new(
            OperationKind::MaxPool2d,
            vec![input, zero, one, zero, one, two, two, three, three, zero],
            vec![output],
        );
        model.add_operation(op.clone());
        model.identify_inputs_and_outputs(vec![input], vec![output]);
        let model = model.validate().unwrap();
        let catalog = OperandCatalog::new(&model, Arc::new(RecordingLink::new())).unwrap();

        let p = pool_params(&catalog, &op).unwrap();
        assert_eq!(p.window.padding, Padding2d::Explicit(ExplicitPadding::new(0, 1, 0, 1)));
        assert_eq!((p.window.stride_height, p.window.filter_width), (2, 3));
        assert_eq!(p.activation, FusedActivation::None);
    }

    #[test]
    fn test_implicit_pool_form() {
        let (catalog, op) = pool_model(&[PaddingScheme::VALID_CODE, 1, 1, 2, 2, 1]);
        let p = pool_params(&catalog, &op).unwrap();
        assert_eq!(p.window.padding, Padding2d::Implicit(PaddingScheme::Valid));
        assert_eq!(p.activation, FusedActivation::Relu);
    }

    #[test]
    fn test_irreconcilable_padding() {
        let (catalog, op) = pool_model(&[2, 0, 0, 0, 1, 1, 3, 3, 0]);
        let p = pool_params(&catalog, &op).unwrap();
        let input = catalog.shape(p.input).unwrap();
        assert!(matches!(
            padding_mode("pool", &p.window, &input),
            Err(LoweringError::UnknownPadding { .. })
        ));
    }

    #[test]
    fn test_bad_arguments() {
        let (catalog, op) = pool_model(&[1, 1, 1, 2]);
        assert!(matches!(pool_params(&catalog, &op), Err(LoweringError::Validation(_))));

        let (catalog, op) = pool_model(&[PaddingScheme::SAME_CODE, 0, 1, 2, 2, 0]);
        assert!(pool_params(&catalog, &op).is_err());

        let (catalog, op) = pool_model(&[7, 1, 1, 2, 2, 0]);
        assert!(matches!(pool_params(&catalog, &op), Err(LoweringError::Shape(_))));
    }

    #[test]
    fn test_huge_padding_is_rejected() {
        let (catalog, op) = pool_model(&[i32::MAX, i32::MAX, 0, 0, 2, 2, 3, 3, 0]);
        let p = pool_params(&catalog, &op).unwrap();
        let input = catalog.shape(p.input).unwrap();
        assert!(p.window.output_hw(7, 7).is_err());
        assert!(matches!(
            padding_mode("pool", &p.window, &input),
            Err(LoweringError::UnknownPadding { .. })
        ));
    }
}
