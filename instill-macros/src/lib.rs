use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned as _;
use syn::{
    Attribute, Data, DeriveInput, Error, Fields, FnArg, GenericArgument, Ident, ImplItem,
    ItemImpl, Pat, Path, PathArguments, ReturnType, Token, Type,
};

const INJECT_ATTR: &str = "inject";
const PROPERTY_ATTR: &str = "property";
const CONSTRUCTOR_ATTR: &str = "constructor";

/// Arguments of `#[inject(ID)]`, `#[inject(ID, optional)]` and `#[property(..)]`.
struct ServiceAttr {
    id: Path,
    optional: bool,
}

impl Parse for ServiceAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let id = input.parse()?;
        let mut optional = false;
        if input.parse::<Option<Token![,]>>()?.is_some() && !input.is_empty() {
            let flag: Ident = input.parse()?;
            if flag != "optional" {
                return Err(Error::new(flag.span(), "expected `optional`"));
            }
            optional = true;
            input.parse::<Option<Token![,]>>()?;
        }
        Ok(Self { id, optional })
    }
}

fn find_service_attr(attrs: &[Attribute], name: &str) -> syn::Result<Option<ServiceAttr>> {
    for attr in attrs {
        if attr.path().is_ident(name) {
            return attr.parse_args().map(Some);
        }
    }
    Ok(None)
}

fn extract_option_type(ty: &Type) -> Option<Type> {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == "Option"
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        return Some(inner.clone());
    }
    None
}

fn extract_handle_type(ty: &Type) -> (Type, bool) {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == "Result"
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        return (inner.clone(), true);
    }
    (ty.clone(), false)
}

/// A value read from `Arguments` into a binding of type `ty`.
///
/// `Option<T>` bindings accept empty values; other bindings require one.
fn read_value(ty: &Type, read: impl FnOnce(bool, &Type) -> TokenStream2) -> TokenStream2 {
    match extract_option_type(ty) {
        Some(inner) => read(true, &inner),
        None => read(false, ty),
    }
}

fn read_positional(ty: &Type, index: usize) -> TokenStream2 {
    read_value(ty, |optional, ty| {
        if optional {
            quote! { args.optional::<#ty>(#index)? }
        } else {
            quote! { args.require::<#ty>(#index)? }
        }
    })
}

fn read_property(ty: &Type, key: &str) -> TokenStream2 {
    read_value(ty, |optional, ty| {
        if optional {
            quote! { args.optional_property::<#ty>(#key)? }
        } else {
            quote! { args.require_property::<#ty>(#key)? }
        }
    })
}

/// Declares a service dependency and checks the identifier type at compile time.
fn declare_dependency(attr: &ServiceAttr, ty: &Type, slot: TokenStream2, kind: &str) -> syn::Result<TokenStream2> {
    let id = &attr.id;
    let service_ty = match extract_option_type(ty) {
        Some(inner) => inner,
        None if attr.optional => {
            return Err(Error::new(
                ty.span(),
                "Optional dependencies must be of type Option<T>",
            ));
        }
        None => ty.clone(),
    };
    let method = match (kind, attr.optional) {
        (INJECT_ATTR, false) => quote! { parameter },
        (INJECT_ATTR, true) => quote! { optional_parameter },
        (_, false) => quote! { property },
        (_, true) => quote! { optional_property },
    };
    Ok(quote! {
        let _: &'static ::instill::ServiceIdentifier<#service_ty> = &#id;
        deps = deps.#method(&#id, #slot);
    })
}

/// Derive macro for the `Constructible` trait.
///
/// Plain fields are fixed arguments, in declaration order. Fields marked with
/// `#[inject(ID)]` are constructor dependencies placed after them, and fields
/// marked with `#[property(ID)]` are property dependencies keyed by field name.
#[proc_macro_derive(Injectable, attributes(inject, property))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    handle_derive_injectable(input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Attribute macro for impl blocks with a `#[constructor]` function.
#[proc_macro_attribute]
pub fn injectable(_attr: TokenStream, item: TokenStream) -> TokenStream {
    if let Ok(item_impl) = syn::parse::<ItemImpl>(item) {
        return handle_injectable_impl(item_impl)
            .unwrap_or_else(Error::into_compile_error)
            .into();
    }
    TokenStream::from(
        Error::new(
            proc_macro2::Span::call_site(),
            "#[injectable] can only be applied to impl blocks",
        )
        .to_compile_error(),
    )
}

fn handle_derive_injectable(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        _ => return Err(Error::new(name.span(), "Only structs are supported")),
    };
    let named: Vec<_> = match fields {
        Fields::Named(fields) => fields.named.iter().collect(),
        Fields::Unnamed(_) => {
            return Err(Error::new(name.span(), "Tuple structs are not supported"));
        }
        Fields::Unit => Vec::new(),
    };

    let mut fixed = Vec::new();
    let mut injected = Vec::new();
    let mut properties = Vec::new();
    for field in named {
        let inject = find_service_attr(&field.attrs, INJECT_ATTR)?;
        let property = find_service_attr(&field.attrs, PROPERTY_ATTR)?;
        match (inject, property) {
            (Some(_), Some(_)) => {
                return Err(Error::new(
                    field.span(),
                    format!("#[{INJECT_ATTR}] and #[{PROPERTY_ATTR}] cannot be combined"),
                ));
            }
            (Some(attr), None) => injected.push((field, attr)),
            (None, Some(attr)) => properties.push((field, attr)),
            (None, None) => fixed.push(field),
        }
    }

    let mut dependency_stmts = Vec::new();
    let mut field_lets = Vec::new();
    let mut field_names = Vec::new();

    for (index, field) in fixed.iter().enumerate() {
        let ident = &field.ident;
        let value = read_positional(&field.ty, index);
        field_lets.push(quote! { let #ident = #value; });
        field_names.push(ident);
    }
    for (offset, (field, attr)) in injected.iter().enumerate() {
        let index = fixed.len() + offset;
        let ident = &field.ident;
        dependency_stmts.push(declare_dependency(attr, &field.ty, quote! { #index }, INJECT_ATTR)?);
        let value = read_positional(&field.ty, index);
        field_lets.push(quote! { let #ident = #value; });
        field_names.push(ident);
    }
    for (field, attr) in &properties {
        let ident = &field.ident;
        let key = ident
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        dependency_stmts.push(declare_dependency(attr, &field.ty, quote! { #key }, PROPERTY_ATTR)?);
        let value = read_property(&field.ty, &key);
        field_lets.push(quote! { let #ident = #value; });
        field_names.push(ident);
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::instill::Constructible for #name #ty_generics #where_clause {
            type Handle = ::std::sync::Arc<Self>;

            fn dependencies() -> ::instill::Dependencies {
                #[allow(unused_mut)]
                let mut deps = ::instill::Dependencies::new();
                #(#dependency_stmts)*
                deps
            }

            fn construct(
                args: ::instill::Arguments,
            ) -> ::std::result::Result<Self::Handle, ::instill::StdError> {
                let _ = &args;
                #(#field_lets)*
                Ok(::std::sync::Arc::new(Self {
                    #(#field_names,)*
                }))
            }
        }
    })
}

fn handle_injectable_impl(input: ItemImpl) -> syn::Result<TokenStream2> {
    if input.trait_.is_some() {
        return Err(Error::new(input.span(), "Trait impls are not supported"));
    }

    let self_ty = &input.self_ty;
    let mut constructor = None;
    for item in &input.items {
        if let ImplItem::Fn(method) = item
            && let Some(attr) = method
                .attrs
                .iter()
                .find(|attr| attr.path().is_ident(CONSTRUCTOR_ATTR))
        {
            if constructor.is_some() {
                return Err(Error::new(attr.span(), "Only one constructor method allowed"));
            }
            constructor = Some(method);
        }
    }
    let Some(method) = constructor else {
        return Err(Error::new(input.span(), "No constructor method found"));
    };
    if method.sig.asyncness.is_some() {
        return Err(Error::new(
            method.sig.span(),
            "Constructor method cannot be async",
        ));
    }

    let method_name = &method.sig.ident;
    let return_type = match &method.sig.output {
        ReturnType::Default => {
            return Err(Error::new(
                method.sig.span(),
                "Constructor method must have a return type",
            ));
        }
        ReturnType::Type(_, ty) => ty.as_ref(),
    };
    let (handle_type, is_result) = extract_handle_type(return_type);

    let mut dependency_stmts = Vec::new();
    let mut arg_lets = Vec::new();
    let mut arg_names = Vec::new();
    let mut cleaned_inputs = Vec::new();

    for (index, fn_arg) in method.sig.inputs.iter().enumerate() {
        let pat_type = match fn_arg {
            FnArg::Receiver(_) => {
                return Err(Error::new(
                    fn_arg.span(),
                    "Constructor method cannot have self parameter",
                ));
            }
            FnArg::Typed(pat_type) => pat_type,
        };
        let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            return Err(Error::new(
                pat_type.pat.span(),
                "Only simple bindings supported",
            ));
        };
        if let Type::Reference(_) = pat_type.ty.as_ref() {
            return Err(Error::new(
                pat_type.ty.span(),
                "Constructor parameters must be owned values",
            ));
        }

        let arg_name = &pat_ident.ident;
        if let Some(attr) = find_service_attr(&pat_type.attrs, INJECT_ATTR)? {
            dependency_stmts.push(declare_dependency(&attr, &pat_type.ty, quote! { #index }, INJECT_ATTR)?);
        }
        let value = read_positional(&pat_type.ty, index);
        arg_lets.push(quote! { let #arg_name = #value; });
        arg_names.push(arg_name);

        let mut cleaned = pat_type.clone();
        cleaned.attrs.retain(|attr| !attr.path().is_ident(INJECT_ATTR));
        cleaned_inputs.push(FnArg::Typed(cleaned));
    }

    let mut cleaned_input = input.clone();
    for item in &mut cleaned_input.items {
        if let ImplItem::Fn(method) = item
            && method
                .attrs
                .iter()
                .any(|attr| attr.path().is_ident(CONSTRUCTOR_ATTR))
        {
            method.sig.inputs = cleaned_inputs.into_iter().collect();
            method
                .attrs
                .retain(|attr| !attr.path().is_ident(CONSTRUCTOR_ATTR));
            break;
        }
    }

    let method_call = quote! { Self::#method_name(#(#arg_names),*) };
    let construct_body = if is_result {
        quote! {
            #(#arg_lets)*
            #method_call.map_err(::std::convert::Into::into)
        }
    } else {
        quote! {
            #(#arg_lets)*
            Ok(#method_call)
        }
    };

    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        #cleaned_input

        impl #impl_generics ::instill::Constructible for #self_ty #where_clause {
            type Handle = #handle_type;

            fn dependencies() -> ::instill::Dependencies {
                #[allow(unused_mut)]
                let mut deps = ::instill::Dependencies::new();
                #(#dependency_stmts)*
                deps
            }

            fn construct(
                args: ::instill::Arguments,
            ) -> ::std::result::Result<Self::Handle, ::instill::StdError> {
                let _ = &args;
                #construct_body
            }
        }
    })
}
