// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator node operations.
//!
//! The runtime identifies operations by a numeric id that differs between
//! runtime builds. Ids are therefore resolved by [`OpCode::name`] when a
//! dynamic link first uses an op; the discriminant here is only a stable
//! local key.

macro_rules! op_codes {
    ($($variant:ident => $name:literal,)*) => {
        /// An accelerator node operation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum OpCode {
            $($variant,)*
        }

        impl OpCode {
            /// Every op, in declaration order.
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant,)*];

            /// Name registered with the runtime.
            pub fn name(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name,)*
                }
            }

            /// Looks an op up by its runtime name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(OpCode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

op_codes! {
    Input => "INPUT",
    Output => "OUTPUT",
    Nop => "Nop",

    // 32-bit float
    AddF => "Add_f",
    MulF => "Mul_f",
    BiasAddF => "BiasAdd_f",
    ReluF => "Relu_f",
    ReluXF => "ReluX_f",
    ClampF => "Clamp_f",
    SigmoidF => "Sigmoid_f",
    TanhF => "Tanh_f",
    SoftmaxF => "Softmax_f",
    AvgPoolF => "AvgPool_f",
    MaxPoolF => "MaxPool_f",
    L2PoolF => "L2Pool_f",
    Conv2dF => "Conv2d_f",
    DepthwiseConv2dF => "DepthwiseConv2d_f",
    MatMulF => "MatMul_f",
    ConcatF => "Concat_f",
    LrnF => "LRN_f",
    ResizeBilinearF => "ResizeBilinear_f",
    Reshape => "Reshape",

    // 8-bit quantized
    QuantizedAdd8p8to32 => "QuantizedAdd_8p8to32",
    QuantizedMul8x8to32 => "QuantizedMul_8x8to32",
    QuantizedBiasAdd32p32to32 => "QuantizedBiasAdd_32p32to32",
    Requantize32to8 => "Requantize_32to8",
    QuantizedRelu8 => "QuantizedRelu_8",
    QuantizedReluX8 => "QuantizedReluX_8",
    QuantizedClamp8 => "QuantizedClamp_8",
    QuantizedSigmoid8 => "QuantizedSigmoid_8",
    QuantizedSoftmax8 => "QuantizedSoftmax_8",
    QuantizedAvgPool8 => "QuantizedAvgPool_8",
    QuantizedMaxPool8 => "QuantizedMaxPool_8",
    QuantizedConv2d8x8to32 => "QuantizedConv2d_8x8to32",
    QuantizedDepthwiseConv2d8x8to32 => "QuantizedDepthwiseConv2d_8x8to32",
    QuantizedMatMul8x8to32 => "QuantizedMatMul_8x8to32",
    QuantizedConcat8 => "QuantizedConcat_8",
    QuantizedReshape => "QuantizedReshape",
    Quantize => "Quantize",
    Dequantize => "Dequantize",
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for &op in OpCode::ALL {
            assert_eq!(OpCode::from_name(op.name()), Some(op));
        }
        assert_eq!(OpCode::from_name("Bogus_f"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(OpCode::Requantize32to8.to_string(), "Requantize_32to8");
        assert_eq!(OpCode::Input.to_string(), "INPUT");
    }
}
