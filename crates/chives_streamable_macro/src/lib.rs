use proc_macro::TokenStream;
use quote::quote;
use syn::Lit::Int;
use syn::{parse_macro_input, DeriveInput, FieldsNamed, FieldsUnnamed};

/// Derives `chives_traits::Streamable` for structs and for enums whose
/// variants all carry explicit u8 discriminants. The generated code uses
/// fully qualified paths, so the deriving crate only needs a dependency on
/// `chives-traits`.
#[proc_macro_derive(Streamable)]
pub fn chives_streamable_macro(input: TokenStream) -> TokenStream {
    let DeriveInput { ident, data, .. } = parse_macro_input!(input);

    let mut fnames = Vec::<syn::Ident>::new();
    let mut findices = Vec::<syn::Index>::new();
    let mut ftypes = Vec::<syn::Type>::new();
    match data {
        syn::Data::Enum(e) => {
            let mut names = Vec::<syn::Ident>::new();
            let mut values = Vec::<u8>::new();
            for v in &e.variants {
                names.push(v.ident.clone());
                let Some((_, expr)) = &v.discriminant else {
                    panic!("enum variants require explicit u8 discriminants");
                };
                let syn::Expr::Lit(l) = expr else {
                    panic!("enum discriminants must be literals");
                };
                let Int(i) = &l.lit else {
                    panic!("enum discriminants must be integers");
                };
                match i.base10_parse::<u8>() {
                    Ok(v) => values.push(v),
                    Err(_) => panic!("enum discriminants must fit in u8"),
                }
            }
            let ret = quote! {
                impl chives_traits::Streamable for #ident {
                    fn update_digest(&self, digest: &mut sha2::Sha256) {
                        chives_traits::Streamable::update_digest(&(*self as u8), digest);
                    }
                    fn stream(&self, out: &mut Vec<u8>) -> chives_traits::Result<()> {
                        chives_traits::Streamable::stream(&(*self as u8), out)
                    }
                    fn parse(input: &mut std::io::Cursor<&[u8]>) -> chives_traits::Result<Self> {
                        let v = <u8 as chives_traits::Streamable>::parse(input)?;
                        match &v {
                            #(#values => Ok(#ident::#names),)*
                            _ => Err(chives_traits::Error::InvalidEnum),
                        }
                    }
                }
            };
            return ret.into();
        }
        syn::Data::Union(_) => {
            panic!("Streamable does not support unions");
        }
        syn::Data::Struct(s) => match s.fields {
            syn::Fields::Unnamed(FieldsUnnamed { unnamed, .. }) => {
                for (index, f) in unnamed.iter().enumerate() {
                    findices.push(syn::Index::from(index));
                    ftypes.push(f.ty.clone());
                }
            }
            syn::Fields::Unit => {
                panic!("Streamable does not support unit structs");
            }
            syn::Fields::Named(FieldsNamed { named, .. }) => {
                for f in &named {
                    fnames.push(f.ident.as_ref().unwrap().clone());
                    ftypes.push(f.ty.clone());
                }
            }
        },
    }

    if !fnames.is_empty() {
        let ret = quote! {
            impl chives_traits::Streamable for #ident {
                fn update_digest(&self, digest: &mut sha2::Sha256) {
                    #(chives_traits::Streamable::update_digest(&self.#fnames, digest);)*
                }
                fn stream(&self, out: &mut Vec<u8>) -> chives_traits::Result<()> {
                    #(chives_traits::Streamable::stream(&self.#fnames, out)?;)*
                    Ok(())
                }
                fn parse(input: &mut std::io::Cursor<&[u8]>) -> chives_traits::Result<Self> {
                    Ok(#ident{ #( #fnames: <#ftypes as chives_traits::Streamable>::parse(input)?, )* })
                }
            }
        };
        ret.into()
    } else if !findices.is_empty() {
        let ret = quote! {
            impl chives_traits::Streamable for #ident {
                fn update_digest(&self, digest: &mut sha2::Sha256) {
                    #(chives_traits::Streamable::update_digest(&self.#findices, digest);)*
                }
                fn stream(&self, out: &mut Vec<u8>) -> chives_traits::Result<()> {
                    #(chives_traits::Streamable::stream(&self.#findices, out)?;)*
                    Ok(())
                }
                fn parse(input: &mut std::io::Cursor<&[u8]>) -> chives_traits::Result<Self> {
                    Ok(#ident( #( <#ftypes as chives_traits::Streamable>::parse(input)?, )* ))
                }
            }
        };
        ret.into()
    } else {
        panic!("structs require at least one field");
    }
}
