use darling::Error;
use darling::ast::NestedMeta;
use quote::quote;
use syn::{Data, DeriveInput, Fields, ItemStruct, parse_macro_input};

use proc_macro::TokenStream;

/// Serializes every field in declaration order through
/// `crate::byteorder::WriteBytesBe` / `WriteBytesLe`.
#[proc_macro_derive(ToBytes)]
pub fn derive_to_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    let fields: Vec<syn::Member> = match input.data {
        Data::Struct(ref s) => match s.fields {
            Fields::Named(ref nf) => nf
                .named
                .iter()
                .filter_map(|f| f.ident.clone())
                .map(syn::Member::from)
                .collect(),
            Fields::Unnamed(ref uf) => (0..uf.unnamed.len())
                .map(|i| syn::Index::from(i).into())
                .collect(),
            Fields::Unit => Vec::new(),
        },
        _ => {
            return TokenStream::from(
                syn::Error::new_spanned(&name, "ToBytes can only be derived for structs")
                    .to_compile_error(),
            );
        }
    };

    let expanded = quote! {
        impl crate::byteorder::WriteBytesBe for #name {
            fn write_be(&self, dst: &mut Vec<u8>) {
                #( crate::byteorder::WriteBytesBe::write_be(&self.#fields, dst); )*
            }
        }

        impl crate::byteorder::WriteBytesLe for #name {
            fn write_le(&self, dst: &mut Vec<u8>) {
                #( crate::byteorder::WriteBytesLe::write_le(&self.#fields, dst); )*
            }
        }
    };

    TokenStream::from(expanded)
}

/// Implements `DffChunk` for a struct with the given 4 byte chunk ID.
/// The chunk body is the struct's big-endian `ToBytes` encoding.
///
/// ```ignore
/// #[derive(ToBytes)]
/// #[dff_chunk(b"FS  ")]
/// pub struct SampleRate {
///     pub sample_rate: u32,
/// }
/// ```
#[proc_macro_attribute]
pub fn dff_chunk(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(v) => v,
        Err(e) => {
            return TokenStream::from(Error::from(e).write_errors());
        }
    };

    let Some(first) = args.first() else {
        return TokenStream::from(
            Error::custom("dff_chunk expects a chunk ID, e.g. b\"FVER\"").write_errors(),
        );
    };

    let id_bytes = match first {
        NestedMeta::Lit(syn::Lit::ByteStr(bs)) => bs.value(),
        _ => {
            return TokenStream::from(
                syn::Error::new_spanned(first, "dff_chunk expects a byte string, e.g. b\"FVER\"")
                    .to_compile_error(),
            );
        }
    };

    if id_bytes.len() != 4 {
        return TokenStream::from(
            syn::Error::new_spanned(first, "dff_chunk expects 4 bytes").to_compile_error(),
        );
    }

    let input = parse_macro_input!(item as ItemStruct);
    let name = &input.ident;

    let expanded = quote! {
        #input

        impl DffChunk for #name {
            fn chunk_id(&self) -> &[u8; 4] {
                const ID: [u8; 4] = [#(#id_bytes),*];
                &ID
            }

            fn chunk_data(&self) -> Vec<u8> {
                let mut vec = Vec::new();
                crate::byteorder::WriteBytesBe::write_be(self, &mut vec);
                vec
            }
        }
    };
    TokenStream::from(expanded)
}
