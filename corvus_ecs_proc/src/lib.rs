use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, Index, Meta, NestedMeta};

/// Derives `corvus_ecs::io::Serializable` from the type's field list.
///
/// Structs are written field by field in declaration order; in tree form every field becomes a key (`"0"`, `"1"`,
/// ... for tuple structs). Enums write a `u8` discriminant (the variant's position) followed by that variant's
/// fields only, and a `"variant"` key holding the variant name in tree form. Reading a variant other than the one
/// held by the default value needs `Default` on that variant's field types.
///
/// Fields marked `#[serializable(skip)]` are not persisted and come back as `Default::default()` (binary) or as
/// the default value's field (tree).
#[proc_macro_derive(Serializable, attributes(serializable))]
pub fn serializable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    let expanded = match &input.data {
        Data::Struct(data) => derive_struct(&input, &data.fields),
        Data::Enum(data) => derive_enum(&input, data),
        Data::Union(_) => Err(syn::Error::new(
            input.ident.span(),
            "Serializable cannot be derived for unions",
        )),
    };

    expanded.unwrap_or_else(|err| err.to_compile_error()).into()
}

struct Field {
    /// How the field is reached on `self` (`name` or `0`)
    member: TokenStream2,
    /// Local binding used in patterns
    binding: Ident,
    /// Key in tree form
    key: String,
    ty: syn::Type,
    skip: bool,
}

fn is_skipped(field: &syn::Field) -> syn::Result<bool> {
    let mut skip = false;

    for attr in field.attrs.iter().filter(|a| a.path.is_ident("serializable")) {
        match attr.parse_meta()? {
            Meta::List(list) => {
                for nested in list.nested {
                    match nested {
                        NestedMeta::Meta(Meta::Path(path)) if path.is_ident("skip") => skip = true,
                        other => return Err(syn::Error::new(other.span(), "unknown serializable attribute")),
                    }
                }
            }
            other => return Err(syn::Error::new(other.span(), "expected #[serializable(...)]")),
        }
    }

    Ok(skip)
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<Field>> {
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let skip = is_skipped(field)?;
            Ok(match &field.ident {
                Some(ident) => Field {
                    member: quote!(#ident),
                    binding: format_ident!("__{}", ident),
                    key: ident.to_string(),
                    ty: field.ty.clone(),
                    skip,
                },
                None => {
                    let index = Index::from(i);
                    Field {
                        member: quote!(#index),
                        binding: format_ident!("__{}", i),
                        key: i.to_string(),
                        ty: field.ty.clone(),
                        skip,
                    }
                }
            })
        })
        .collect()
}

/// `Path { a: __a, b: __b }`, `Path(__0, __1)` or `Path`, used both as a pattern and as a constructor.
fn pattern(path: TokenStream2, fields: &Fields, parts: &[TokenStream2]) -> TokenStream2 {
    match fields {
        Fields::Named(named) => {
            let names = named.named.iter().map(|f| f.ident.as_ref());
            quote!(#path { #(#names: #parts),* })
        }
        Fields::Unnamed(_) => quote!(#path( #(#parts),* )),
        Fields::Unit => path,
    }
}

fn derive_struct(input: &DeriveInput, fields: &Fields) -> syn::Result<TokenStream2> {
    let fields = collect_fields(fields)?;
    let kept: Vec<&Field> = fields.iter().filter(|f| !f.skip).collect();

    let kept_members: Vec<_> = kept.iter().map(|f| &f.member).collect();
    let kept_types: Vec<_> = kept.iter().map(|f| &f.ty).collect();
    let kept_keys: Vec<_> = kept.iter().map(|f| &f.key).collect();

    let read_binary_parts: Vec<TokenStream2> = fields
        .iter()
        .map(|f| {
            let ty = &f.ty;
            if f.skip {
                quote!(::std::default::Default::default())
            } else {
                quote!(<#ty as ::corvus_ecs::io::Serializable>::read_binary(cursor, remap)?)
            }
        })
        .collect();

    let bindings: Vec<TokenStream2> = fields.iter().map(|f| {
        let b = &f.binding;
        quote!(#b)
    }).collect();

    let read_tree_parts: Vec<TokenStream2> = fields
        .iter()
        .map(|f| {
            let (b, key) = (&f.binding, &f.key);
            if f.skip {
                quote!(#b)
            } else {
                quote!(::corvus_ecs::io::read_field(object, #key, #b, remap)?)
            }
        })
        .collect();

    let data_fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => unreachable!(),
    };
    let read_binary_value = pattern(quote!(Self), data_fields, &read_binary_parts);
    let default_pattern = pattern(quote!(Self), data_fields, &bindings);
    let read_tree_value = pattern(quote!(Self), data_fields, &read_tree_parts);

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #[allow(unused_variables)]
        impl #impl_generics ::corvus_ecs::io::Serializable for #name #ty_generics #where_clause {
            fn binary_size(&self) -> usize {
                0 #( + ::corvus_ecs::io::Serializable::binary_size(&self.#kept_members) )*
            }

            fn write_binary(
                &self,
                cursor: &mut ::corvus_ecs::io::WriteCursor<'_>,
                remap: &::corvus_ecs::io::RemapTable,
            ) -> ::corvus_ecs::Result<()> {
                #( ::corvus_ecs::io::Serializable::write_binary(&self.#kept_members, cursor, remap)?; )*
                Ok(())
            }

            fn read_binary(
                cursor: &mut ::corvus_ecs::io::ReadCursor<'_>,
                remap: &::corvus_ecs::io::RemapTable,
            ) -> ::corvus_ecs::Result<Self> {
                Ok(#read_binary_value)
            }

            fn write_tree(&self, remap: &::corvus_ecs::io::RemapTable) -> ::corvus_ecs::Result<::corvus_ecs::io::Value> {
                let mut object = ::corvus_ecs::io::Map::new();
                #(
                    object.insert(
                        #kept_keys.to_string(),
                        <#kept_types as ::corvus_ecs::io::Serializable>::write_tree(&self.#kept_members, remap)?,
                    );
                )*
                Ok(::corvus_ecs::io::Value::Object(object))
            }

            fn read_tree(
                node: &::corvus_ecs::io::Value,
                default: Self,
                remap: &::corvus_ecs::io::RemapTable,
            ) -> ::corvus_ecs::Result<Self> {
                let object = ::corvus_ecs::io::expect_object(node)?;
                let #default_pattern = default;
                Ok(#read_tree_value)
            }

            fn intern_resources(&self, remap: &mut ::corvus_ecs::io::RemapTable) {
                #( ::corvus_ecs::io::Serializable::intern_resources(&self.#kept_members, remap); )*
            }
        }
    })
}

fn derive_enum(input: &DeriveInput, data: &syn::DataEnum) -> syn::Result<TokenStream2> {
    if data.variants.len() > usize::from(u8::MAX) + 1 {
        return Err(syn::Error::new(input.ident.span(), "Serializable enums are limited to 256 variants"));
    }

    let name = &input.ident;
    let ty_name = name.to_string();

    let mut size_arms = Vec::new();
    let mut write_binary_arms = Vec::new();
    let mut read_binary_arms = Vec::new();
    let mut write_tree_arms = Vec::new();
    let mut read_tree_arms = Vec::new();
    let mut intern_arms = Vec::new();

    for (discriminant, variant) in data.variants.iter().enumerate() {
        let discriminant = discriminant as u8;
        let ident = &variant.ident;
        let variant_name = ident.to_string();
        let path = quote!(Self::#ident);

        let fields = collect_fields(&variant.fields)?;
        let kept: Vec<&Field> = fields.iter().filter(|f| !f.skip).collect();
        let kept_bindings: Vec<_> = kept.iter().map(|f| &f.binding).collect();
        let kept_types: Vec<_> = kept.iter().map(|f| &f.ty).collect();
        let kept_keys: Vec<_> = kept.iter().map(|f| &f.key).collect();

        let bindings: Vec<TokenStream2> = fields.iter().map(|f| {
            let b = &f.binding;
            quote!(#b)
        }).collect();
        let bound = pattern(path.clone(), &variant.fields, &bindings);

        size_arms.push(quote! {
            #bound => 1 #( + ::corvus_ecs::io::Serializable::binary_size(#kept_bindings) )*
        });

        write_binary_arms.push(quote! {
            #bound => {
                cursor.write_u8(#discriminant)?;
                #( ::corvus_ecs::io::Serializable::write_binary(#kept_bindings, cursor, remap)?; )*
            }
        });

        let read_binary_parts: Vec<TokenStream2> = fields
            .iter()
            .map(|f| {
                let ty = &f.ty;
                if f.skip {
                    quote!(::std::default::Default::default())
                } else {
                    quote!(<#ty as ::corvus_ecs::io::Serializable>::read_binary(cursor, remap)?)
                }
            })
            .collect();
        let read_binary_value = pattern(path.clone(), &variant.fields, &read_binary_parts);
        read_binary_arms.push(quote! {
            #discriminant => Ok(#read_binary_value)
        });

        write_tree_arms.push(quote! {
            #bound => {
                object.insert(
                    ::corvus_ecs::io::VARIANT_KEY.to_string(),
                    ::corvus_ecs::io::Value::String(#variant_name.to_string()),
                );
                #(
                    object.insert(
                        #kept_keys.to_string(),
                        <#kept_types as ::corvus_ecs::io::Serializable>::write_tree(#kept_bindings, remap)?,
                    );
                )*
            }
        });

        let read_tree_parts: Vec<TokenStream2> = fields
            .iter()
            .map(|f| {
                let (b, key) = (&f.binding, &f.key);
                if f.skip {
                    quote!(#b)
                } else {
                    quote!(::corvus_ecs::io::read_field(object, #key, #b, remap)?)
                }
            })
            .collect();
        let read_tree_value = pattern(path.clone(), &variant.fields, &read_tree_parts);

        if fields.is_empty() {
            read_tree_arms.push(quote! {
                #variant_name => Ok(#read_tree_value)
            });
        } else {
            // Start from the default's fields when it already is this variant, from `Default` otherwise
            let defaults = fields.iter().map(|_| quote!(::std::default::Default::default()));
            read_tree_arms.push(quote! {
                #variant_name => {
                    let ( #(#bindings,)* ) = match default {
                        #bound => ( #(#bindings,)* ),
                        _ => ( #(#defaults,)* ),
                    };
                    Ok(#read_tree_value)
                }
            });
        }

        intern_arms.push(quote! {
            #bound => {
                #( ::corvus_ecs::io::Serializable::intern_resources(#kept_bindings, remap); )*
            }
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #[allow(unused_variables, unreachable_patterns)]
        impl #impl_generics ::corvus_ecs::io::Serializable for #name #ty_generics #where_clause {
            fn binary_size(&self) -> usize {
                match self {
                    #(#size_arms,)*
                }
            }

            fn write_binary(
                &self,
                cursor: &mut ::corvus_ecs::io::WriteCursor<'_>,
                remap: &::corvus_ecs::io::RemapTable,
            ) -> ::corvus_ecs::Result<()> {
                match self {
                    #(#write_binary_arms)*
                }
                Ok(())
            }

            fn read_binary(
                cursor: &mut ::corvus_ecs::io::ReadCursor<'_>,
                remap: &::corvus_ecs::io::RemapTable,
            ) -> ::corvus_ecs::Result<Self> {
                match cursor.read_u8()? {
                    #(#read_binary_arms,)*
                    value => Err(::corvus_ecs::Error::InvalidDiscriminant { ty: #ty_name, value }),
                }
            }

            fn write_tree(&self, remap: &::corvus_ecs::io::RemapTable) -> ::corvus_ecs::Result<::corvus_ecs::io::Value> {
                let mut object = ::corvus_ecs::io::Map::new();
                match self {
                    #(#write_tree_arms)*
                }
                Ok(::corvus_ecs::io::Value::Object(object))
            }

            fn read_tree(
                node: &::corvus_ecs::io::Value,
                default: Self,
                remap: &::corvus_ecs::io::RemapTable,
            ) -> ::corvus_ecs::Result<Self> {
                let object = ::corvus_ecs::io::expect_object(node)?;
                let variant = match ::corvus_ecs::io::variant_name(object)? {
                    Some(variant) => variant,
                    None => return Ok(default),
                };

                match variant {
                    #(#read_tree_arms,)*
                    other => Err(::corvus_ecs::Error::UnknownVariant {
                        ty: #ty_name,
                        variant: other.to_string(),
                    }),
                }
            }

            fn intern_resources(&self, remap: &mut ::corvus_ecs::io::RemapTable) {
                match self {
                    #(#intern_arms)*
                }
            }
        }
    })
}
